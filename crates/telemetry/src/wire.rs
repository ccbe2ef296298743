use serde::{Deserialize, Deserializer};
use simcore::TelemetryFrame;

/// One decoded polling response: the telemetry payload plus the transport's
/// opaque dedup tag, still attached.
///
/// `t` and the tag are lenient: a missing or non-numeric value decodes to
/// `None` instead of failing the whole snapshot, so the filter can classify
/// the frame (malformed vs. transport error) rather than the decoder.
/// Every other field defaults to `0` when absent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelemetrySnapshot {
    #[serde(deserialize_with = "numeric_or_none")]
    pub t: Option<f64>,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
    pub servo_roll_angle: f64,
    pub servo_yaw_angle: f64,
    #[serde(rename = "diskRollRPM")]
    pub disk_roll_rpm: f64,
    #[serde(rename = "diskYawRPM")]
    pub disk_yaw_rpm: f64,
    /// Server-assigned tag identifying the underlying update; equal tags on
    /// consecutive polls mean the same update was delivered twice.
    #[serde(rename = "serverTimestamp", deserialize_with = "numeric_or_none")]
    pub server_timestamp: Option<f64>,
}

impl TelemetrySnapshot {
    /// The frame payload with the transport tag split off, or `None` when
    /// the snapshot has no usable time field.
    pub fn frame(&self) -> Option<TelemetryFrame> {
        let t = self.t?;
        Some(TelemetryFrame {
            t,
            roll: self.roll,
            pitch: self.pitch,
            yaw: self.yaw,
            gyro_x: self.gyro_x,
            gyro_y: self.gyro_y,
            gyro_z: self.gyro_z,
            servo_roll_angle: self.servo_roll_angle,
            servo_yaw_angle: self.servo_yaw_angle,
            disk_roll_rpm: self.disk_roll_rpm,
            disk_yaw_rpm: self.disk_yaw_rpm,
        })
    }
}

fn numeric_or_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}
