//! Single-link URDF reader.

use std::io::BufRead;
use std::path::Path;

use glam::Vec3;
use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{CollisionShape, Geometry, Inertial, ModelError, RigidBodyModel};
use crate::{core::types::Pose, utils::math::quat_from_euler};

type Result<T> = std::result::Result<T, ModelError>;

/// Reads and parses a URDF file.
pub fn load_urdf(path: impl AsRef<Path>) -> Result<RigidBodyModel> {
    let xml = std::fs::read_to_string(path.as_ref())?;
    parse_urdf_str(&xml)
}

/// Parses a URDF document describing one rigid link.
///
/// # Errors
///
/// Returns an error if the XML is malformed, required elements are missing,
/// the robot has more than one link, or a collision uses mesh geometry.
pub fn parse_urdf_str(xml: &str) -> Result<RigidBodyModel> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut model = None;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"robot" => {
                model = Some(parse_robot(&mut reader, e)?);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ModelError::XmlParse(e.to_string())),
        }
        buf.clear();
    }

    model.ok_or_else(|| ModelError::missing_element("robot", "URDF document"))
}

struct LinkDescription {
    name: String,
    inertial: Option<Inertial>,
    collisions: Vec<CollisionShape>,
}

fn parse_robot<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<RigidBodyModel> {
    let name = get_attribute(start, "name")?;
    let mut links = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let elem_name = e.name().as_ref().to_vec();
                match elem_name.as_slice() {
                    b"link" => links.push(parse_link(reader, e)?),
                    _ => skip_element(reader, &elem_name)?,
                }
            }
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"link" => {
                links.push(LinkDescription {
                    name: get_attribute(e, "name")?,
                    inertial: None,
                    collisions: Vec::new(),
                });
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"robot" => break,
            Ok(Event::Eof) => return Err(ModelError::XmlParse("unexpected EOF in robot".into())),
            Ok(_) => {}
            Err(e) => return Err(ModelError::XmlParse(e.to_string())),
        }
        buf.clear();
    }

    if links.len() > 1 {
        return Err(ModelError::Unsupported(format!(
            "robot '{name}' has {} links; only single-link bodies can be dropped",
            links.len()
        )));
    }
    let link = links
        .pop()
        .ok_or_else(|| ModelError::missing_element("link", format!("robot '{name}'")))?;

    if link.collisions.is_empty() {
        warn!("model '{name}' has no collision geometry; it will fall through the plane");
    }
    debug!(
        "parsed URDF '{name}': link '{}', {} collision shape(s), inertial: {}",
        link.name,
        link.collisions.len(),
        link.inertial.is_some()
    );

    Ok(RigidBodyModel {
        name,
        link: link.name,
        inertial: link.inertial,
        collisions: link.collisions,
    })
}

fn parse_link<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<LinkDescription> {
    let name = get_attribute(start, "name")?;
    let mut link = LinkDescription {
        name,
        inertial: None,
        collisions: Vec::new(),
    };
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let elem_name = e.name().as_ref().to_vec();
                match elem_name.as_slice() {
                    b"inertial" => link.inertial = Some(parse_inertial(reader, &link.name)?),
                    b"collision" => link.collisions.push(parse_collision(reader, &link.name)?),
                    _ => skip_element(reader, &elem_name)?,
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"link" => break,
            Ok(Event::Eof) => return Err(ModelError::XmlParse("unexpected EOF in link".into())),
            Ok(_) => {}
            Err(e) => return Err(ModelError::XmlParse(e.to_string())),
        }
        buf.clear();
    }

    Ok(link)
}

fn parse_inertial<R: BufRead>(reader: &mut Reader<R>, link: &str) -> Result<Inertial> {
    let mut center_of_mass = Vec3::ZERO;
    let mut mass = None;
    let mut principal_inertia = Vec3::ZERO;
    let mut products_of_inertia = Vec3::ZERO;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"origin" => {
                    center_of_mass = parse_origin(e)?.position;
                    if get_attribute_opt(e, "rpy").is_some() {
                        debug!("ignoring inertial frame rotation on link '{link}'");
                    }
                }
                b"mass" => mass = Some(parse_float(e, "value")?),
                b"inertia" => {
                    principal_inertia = Vec3::new(
                        parse_float_or_zero(e, "ixx")?,
                        parse_float_or_zero(e, "iyy")?,
                        parse_float_or_zero(e, "izz")?,
                    );
                    products_of_inertia = Vec3::new(
                        parse_float_or_zero(e, "ixy")?,
                        parse_float_or_zero(e, "ixz")?,
                        parse_float_or_zero(e, "iyz")?,
                    );
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"inertial" => break,
            Ok(Event::Eof) => {
                return Err(ModelError::XmlParse("unexpected EOF in inertial".into()))
            }
            Ok(_) => {}
            Err(e) => return Err(ModelError::XmlParse(e.to_string())),
        }
        buf.clear();
    }

    let mass = mass.ok_or_else(|| ModelError::missing_element("mass", format!("link '{link}'")))?;
    if !(mass > 0.0) {
        return Err(ModelError::invalid_attribute(
            "value",
            "mass",
            format!("mass must be positive, got {mass}"),
        ));
    }
    if principal_inertia.min_element() < 0.0 {
        return Err(ModelError::invalid_attribute(
            "ixx/iyy/izz",
            "inertia",
            "principal moments must be non-negative",
        ));
    }
    if products_of_inertia != Vec3::ZERO {
        debug!("link '{link}' has products of inertia; only the diagonal is applied");
    }

    Ok(Inertial {
        center_of_mass,
        mass,
        principal_inertia,
        products_of_inertia,
    })
}

fn parse_collision<R: BufRead>(reader: &mut Reader<R>, link: &str) -> Result<CollisionShape> {
    let mut origin = Pose::default();
    let mut geometry = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"geometry" => {
                geometry = Some(parse_geometry(reader)?);
            }
            Ok(Event::Start(ref e)) => {
                let elem_name = e.name().as_ref().to_vec();
                if elem_name.as_slice() == b"origin" {
                    origin = parse_origin(e)?;
                }
                skip_element(reader, &elem_name)?;
            }
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"origin" => {
                origin = parse_origin(e)?;
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"collision" => break,
            Ok(Event::Eof) => {
                return Err(ModelError::XmlParse("unexpected EOF in collision".into()))
            }
            Ok(_) => {}
            Err(e) => return Err(ModelError::XmlParse(e.to_string())),
        }
        buf.clear();
    }

    let geometry = geometry
        .ok_or_else(|| ModelError::missing_element("geometry", format!("collision of '{link}'")))?;
    Ok(CollisionShape { origin, geometry })
}

fn parse_geometry<R: BufRead>(reader: &mut Reader<R>) -> Result<Geometry> {
    let mut geometry = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"box" => {
                    let size = parse_vector3(&get_attribute(e, "size")?)?;
                    if size.min_element() <= 0.0 {
                        return Err(ModelError::invalid_attribute(
                            "size",
                            "box",
                            "extents must be positive",
                        ));
                    }
                    geometry = Some(Geometry::Box {
                        half_extents: size * 0.5,
                    });
                }
                b"sphere" => {
                    geometry = Some(Geometry::Sphere {
                        radius: parse_positive(e, "radius")?,
                    });
                }
                b"cylinder" => {
                    geometry = Some(Geometry::Cylinder {
                        radius: parse_positive(e, "radius")?,
                        length: parse_positive(e, "length")?,
                    });
                }
                b"capsule" => {
                    geometry = Some(Geometry::Capsule {
                        radius: parse_positive(e, "radius")?,
                        length: parse_positive(e, "length")?,
                    });
                }
                b"plane" => {
                    let normal = get_attribute_opt(e, "normal")
                        .map(|s| parse_vector3(&s))
                        .transpose()?
                        .unwrap_or(Vec3::Z);
                    let normal = normal.try_normalize().ok_or_else(|| {
                        ModelError::invalid_attribute("normal", "plane", "normal must be non-zero")
                    })?;
                    geometry = Some(Geometry::Plane { normal });
                }
                b"mesh" => {
                    let filename = get_attribute_opt(e, "filename").unwrap_or_default();
                    return Err(ModelError::Unsupported(format!(
                        "mesh collision geometry ('{filename}')"
                    )));
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"geometry" => break,
            Ok(Event::Eof) => {
                return Err(ModelError::XmlParse("unexpected EOF in geometry".into()))
            }
            Ok(_) => {}
            Err(e) => return Err(ModelError::XmlParse(e.to_string())),
        }
        buf.clear();
    }

    geometry.ok_or_else(|| ModelError::missing_element("shape", "geometry"))
}

fn parse_origin(e: &BytesStart) -> Result<Pose> {
    let xyz = get_attribute_opt(e, "xyz")
        .map(|s| parse_vector3(&s))
        .transpose()?
        .unwrap_or(Vec3::ZERO);
    let rpy = get_attribute_opt(e, "rpy")
        .map(|s| parse_vector3(&s))
        .transpose()?
        .unwrap_or(Vec3::ZERO);

    Ok(Pose::new(xyz, quat_from_euler(rpy.x, rpy.y, rpy.z)))
}

fn get_attribute(e: &BytesStart, name: &'static str) -> Result<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == name.as_bytes() {
            return String::from_utf8(attr.value.to_vec())
                .map_err(|_| ModelError::invalid_attribute(name, element_name(e), "invalid UTF-8"));
        }
    }
    Err(ModelError::missing_attribute(name, element_name(e)))
}

fn get_attribute_opt(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name.as_bytes())
        .and_then(|attr| String::from_utf8(attr.value.to_vec()).ok())
}

fn parse_float(e: &BytesStart, name: &'static str) -> Result<f32> {
    let raw = get_attribute(e, name)?;
    raw.trim()
        .parse()
        .map_err(|_| ModelError::invalid_attribute(name, element_name(e), "expected a number"))
}

fn parse_float_or_zero(e: &BytesStart, name: &'static str) -> Result<f32> {
    match get_attribute_opt(e, name) {
        Some(_) => parse_float(e, name),
        None => Ok(0.0),
    }
}

fn parse_positive(e: &BytesStart, name: &'static str) -> Result<f32> {
    let value = parse_float(e, name)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ModelError::invalid_attribute(
            name,
            element_name(e),
            format!("expected a positive value, got {value}"),
        ))
    }
}

fn parse_vector3(s: &str) -> Result<Vec3> {
    let parts: Vec<f32> = s
        .split_whitespace()
        .map(|p| p.parse::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| ModelError::XmlParse(format!("invalid vector3: {s}")))?;

    match parts.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(ModelError::XmlParse(format!(
            "expected 3 values in vector, got {}: {s}",
            parts.len()
        ))),
    }
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn skip_element<R: BufRead>(reader: &mut Reader<R>, name: &[u8]) -> Result<()> {
    let mut buf = Vec::new();
    let mut depth = 1;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == name => depth += 1,
            Ok(Event::End(ref e)) if e.name().as_ref() == name => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ModelError::XmlParse(e.to_string())),
        }
        buf.clear();
    }

    Ok(())
}
