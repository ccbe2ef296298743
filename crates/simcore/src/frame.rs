use serde::{Deserialize, Serialize};

/// A single frame of telemetry from the boat's IMU and CMG control loops.
///
/// All angles are in degrees, gyro rates in degrees per second, disk speeds
/// in revolutions per minute. The serde renames reproduce the JSON wire
/// shape emitted by the hardware and the frame generators, so a frame
/// round-trips through `serde_json` unchanged.
///
/// Within one accepted stream, `t` is strictly increasing; the ingestion
/// pipeline enforces this, producers are not trusted to.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelemetryFrame {
    /// Time in seconds (simulation time or wall clock, source-dependent).
    pub t: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
    /// Commanded gimbal angle of the roll CMG.
    pub servo_roll_angle: f64,
    /// Commanded gimbal angle of the yaw CMG.
    pub servo_yaw_angle: f64,
    #[serde(rename = "diskRollRPM")]
    pub disk_roll_rpm: f64,
    #[serde(rename = "diskYawRPM")]
    pub disk_yaw_rpm: f64,
}
