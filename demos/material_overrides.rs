use drop_settle::*;

fn main() -> Result<()> {
    let mut session = EngineSession::initialize(ScriptedBackend::default(), ConnectionMode::Direct)?;
    session.configure(&SimulationConfig::default())?;

    let object = session.load_body("object.urdf", &LoadOptions::with_inertia_from_file())?;
    session.set_material(object, &BodyMaterial::damping(0.1, 0.2))?;
    session.set_material(object, &BodyMaterial::restitution(0.6))?;
    session.set_material(object, &BodyMaterial::damping(0.1, 0.02))?;

    if let Some(material) = session.material(object) {
        println!("Effective material of {object}: {material:?}");
    }

    let mut harness = TrialHarness::new(
        &mut session,
        object,
        OrientationSampler::from_seed(1),
        HarnessSettings::default(),
    );
    let outcome = harness.run_trial(1.0, 0)?;
    println!(
        "Dropped from {:.2} m, settled after {} steps",
        outcome.height, outcome.steps
    );

    session.teardown()
}
