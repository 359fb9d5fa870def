//! Structured-value persistence helpers
//!
//! Entities and components save into and load from a generic key-indexed
//! value tree ([`serde_json::Value`]). How that tree is encoded on disk is up
//! to the caller.

use crate::foundation::math::{Quat, Quaternion, Vec3};
use crate::foundation::uid::Uid;
use serde_json::{Map, Value};
use thiserror::Error;

/// Object node that savers write their fields into
pub type JsonObject = Map<String, Value>;

/// Persistence errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// Required key absent
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    /// Key present with the wrong shape
    #[error("field '{field}' is invalid: expected {expected}")]
    InvalidField {
        /// Offending key
        field: &'static str,
        /// Description of the accepted shape
        expected: &'static str,
    },

    /// Component tag outside the known set
    #[error("unknown component type tag {0}")]
    UnknownComponentType(u64),

    /// Component type has no factory registered
    #[error("no factory registered for component type {0}")]
    UnregisteredComponent(String),
}

fn field<'a>(json: &'a Value, key: &'static str) -> Result<&'a Value, PersistenceError> {
    json.get(key).ok_or(PersistenceError::MissingField(key))
}

/// Read a number as `f32`
#[allow(clippy::cast_possible_truncation)]
pub fn read_f32(json: &Value, key: &'static str) -> Result<f32, PersistenceError> {
    field(json, key)?
        .as_f64()
        .map(|v| v as f32)
        .ok_or(PersistenceError::InvalidField { field: key, expected: "number" })
}

/// Read an unsigned integer
pub fn read_u64(json: &Value, key: &'static str) -> Result<u64, PersistenceError> {
    field(json, key)?
        .as_u64()
        .ok_or(PersistenceError::InvalidField { field: key, expected: "unsigned integer" })
}

/// Read a boolean
pub fn read_bool(json: &Value, key: &'static str) -> Result<bool, PersistenceError> {
    field(json, key)?
        .as_bool()
        .ok_or(PersistenceError::InvalidField { field: key, expected: "boolean" })
}

/// Read a string
pub fn read_str<'a>(json: &'a Value, key: &'static str) -> Result<&'a str, PersistenceError> {
    field(json, key)?
        .as_str()
        .ok_or(PersistenceError::InvalidField { field: key, expected: "string" })
}

/// Read a UID stored as an unsigned integer
pub fn read_uid(json: &Value, key: &'static str) -> Result<Uid, PersistenceError> {
    read_u64(json, key).map(Uid::from_raw)
}

/// Read a fixed-length array of numbers
#[allow(clippy::cast_possible_truncation)]
pub fn read_floats<const N: usize>(json: &Value, key: &'static str) -> Result<[f32; N], PersistenceError> {
    let invalid = PersistenceError::InvalidField { field: key, expected: "array of numbers" };
    let array = field(json, key)?.as_array().ok_or_else(|| invalid.clone())?;
    if array.len() != N {
        return Err(invalid);
    }

    let mut out = [0.0; N];
    for (slot, value) in out.iter_mut().zip(array) {
        *slot = value.as_f64().ok_or_else(|| invalid.clone())? as f32;
    }
    Ok(out)
}

/// Read a 3-component vector
pub fn read_vec3(json: &Value, key: &'static str) -> Result<Vec3, PersistenceError> {
    read_floats::<3>(json, key).map(Vec3::from)
}

/// Read a rotation stored as `[x, y, z, w]`
pub fn read_quat(json: &Value, key: &'static str) -> Result<Quat, PersistenceError> {
    let [x, y, z, w] = read_floats::<4>(json, key)?;
    Ok(Quat::new_normalize(Quaternion::new(w, x, y, z)))
}

/// Write a 3-component vector
pub fn write_vec3(json: &mut JsonObject, key: &str, value: &Vec3) {
    json.insert(key.to_string(), Value::from(vec![value.x, value.y, value.z]));
}

/// Write a rotation as `[x, y, z, w]`
pub fn write_quat(json: &mut JsonObject, key: &str, value: &Quat) {
    let q = value.quaternion();
    json.insert(key.to_string(), Value::from(vec![q.i, q.j, q.k, q.w]));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reads_typed_fields() {
        let value = json!({ "Kl": 0.5, "Id": 42, "Active": true, "Name": "Cube", "Color": [1.0, 0.5, 0.25] });

        assert_eq!(read_f32(&value, "Kl").unwrap(), 0.5);
        assert_eq!(read_uid(&value, "Id").unwrap(), Uid::from_raw(42));
        assert!(read_bool(&value, "Active").unwrap());
        assert_eq!(read_str(&value, "Name").unwrap(), "Cube");
        assert_eq!(read_vec3(&value, "Color").unwrap(), Vec3::new(1.0, 0.5, 0.25));
    }

    #[test]
    fn test_reports_missing_and_malformed_fields() {
        let value = json!({ "Color": [1.0, 2.0], "Active": "yes" });

        assert_eq!(read_f32(&value, "Kq"), Err(PersistenceError::MissingField("Kq")));
        assert!(matches!(read_vec3(&value, "Color"), Err(PersistenceError::InvalidField { field: "Color", .. })));
        assert!(matches!(read_bool(&value, "Active"), Err(PersistenceError::InvalidField { .. })));
    }

    #[test]
    fn test_quat_layout_is_xyzw() {
        let mut object = JsonObject::new();
        let rotation = Quat::from_axis_angle(&Vec3::z_axis(), 1.0);
        write_quat(&mut object, "Rotation", &rotation);

        let value = Value::Object(object);
        let stored = read_floats::<4>(&value, "Rotation").unwrap();
        assert!((stored[3] - rotation.quaternion().w).abs() < 1e-6);
        let back = read_quat(&value, "Rotation").unwrap();
        assert!(back.angle_to(&rotation) < 1e-4);
    }
}
