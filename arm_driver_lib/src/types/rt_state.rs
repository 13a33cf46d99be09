//! Real-time state packets as reported by each controller firmware generation.
//!
//! The packets arrive already decoded from the controller's real-time
//! interface. Every generation carries the same core fields under the same
//! names, plus whatever extra state that firmware adds. They share no base
//! type; each one converts into [`RtSnapshot`], which is what gets published.

use eyre::Result;
use serde::{Deserialize, Serialize};

/// Joint count of the arms served by the real-time interface.
pub const JOINT_COUNT: usize = 6;

pub type JointArray = [f64; JOINT_COUNT];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Double3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Double3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Pose (or pose rate) with a linear part and an axis-angle rotation part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CartesianCoord {
    pub position: Double3,
    pub rotation: Double3,
}

/// Firmware 1.6 and 1.7
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtStateV1_6_7 {
    pub time: f64,
    pub q_target: JointArray,
    pub qd_target: JointArray,
    pub qdd_target: JointArray,
    pub i_target: JointArray,
    pub m_target: JointArray,
    pub q_actual: JointArray,
    pub qd_actual: JointArray,
    pub i_actual: JointArray,
    pub tool_accelerometer_values: Double3,
    /// Force in [0..3), torque in [3..6)
    pub tcp_force: [f64; 6],
    pub tool_vector_actual: CartesianCoord,
    pub tcp_speed_actual: CartesianCoord,
    pub digital_inputs: u64,
    pub motor_temperatures: JointArray,
    pub controller_time: f64,
    pub robot_mode: f64,
    pub joint_modes: JointArray,
}

/// Firmware 1.8
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtStateV1_8 {
    pub time: f64,
    pub q_target: JointArray,
    pub qd_target: JointArray,
    pub qdd_target: JointArray,
    pub i_target: JointArray,
    pub m_target: JointArray,
    pub q_actual: JointArray,
    pub qd_actual: JointArray,
    pub i_actual: JointArray,
    pub tool_accelerometer_values: Double3,
    pub tcp_force: [f64; 6],
    pub tool_vector_actual: CartesianCoord,
    pub tcp_speed_actual: CartesianCoord,
    pub digital_inputs: u64,
    pub motor_temperatures: JointArray,
    pub controller_time: f64,
    pub robot_mode: f64,
    pub joint_modes: JointArray,
    pub digital_outputs: u64,
    pub program_state: f64,
}

/// Firmware 3.0 and 3.1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtStateV3_0_1 {
    pub time: f64,
    pub q_target: JointArray,
    pub qd_target: JointArray,
    pub qdd_target: JointArray,
    pub i_target: JointArray,
    pub m_target: JointArray,
    pub q_actual: JointArray,
    pub qd_actual: JointArray,
    pub i_actual: JointArray,
    pub i_control: JointArray,
    pub tool_vector_actual: CartesianCoord,
    pub tcp_speed_actual: CartesianCoord,
    pub tcp_force: [f64; 6],
    pub tool_vector_target: CartesianCoord,
    pub tcp_speed_target: CartesianCoord,
    pub digital_inputs: u64,
    pub motor_temperatures: JointArray,
    pub controller_time: f64,
    pub robot_mode: f64,
    pub joint_modes: JointArray,
    pub safety_mode: f64,
    pub tool_accelerometer_values: Double3,
    pub speed_scaling: f64,
    pub linear_momentum_norm: f64,
    pub v_main: f64,
    pub v_robot: f64,
    pub i_robot: f64,
    pub v_actual: JointArray,
}

/// Firmware 3.2 and 3.3
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtStateV3_2_3 {
    pub time: f64,
    pub q_target: JointArray,
    pub qd_target: JointArray,
    pub qdd_target: JointArray,
    pub i_target: JointArray,
    pub m_target: JointArray,
    pub q_actual: JointArray,
    pub qd_actual: JointArray,
    pub i_actual: JointArray,
    pub i_control: JointArray,
    pub tool_vector_actual: CartesianCoord,
    pub tcp_speed_actual: CartesianCoord,
    pub tcp_force: [f64; 6],
    pub tool_vector_target: CartesianCoord,
    pub tcp_speed_target: CartesianCoord,
    pub digital_inputs: u64,
    pub motor_temperatures: JointArray,
    pub controller_time: f64,
    pub robot_mode: f64,
    pub joint_modes: JointArray,
    pub safety_mode: f64,
    pub tool_accelerometer_values: Double3,
    pub speed_scaling: f64,
    pub linear_momentum_norm: f64,
    pub v_main: f64,
    pub v_robot: f64,
    pub i_robot: f64,
    pub v_actual: JointArray,
    pub digital_outputs: u64,
    pub program_state: f64,
}

/// A packet of any supported generation, tagged on the bus by `version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum RtPacket {
    #[serde(rename = "v1_6_7")]
    V1_6_7(RtStateV1_6_7),
    #[serde(rename = "v1_8")]
    V1_8(RtStateV1_8),
    #[serde(rename = "v3_0_1")]
    V3_0_1(RtStateV3_0_1),
    #[serde(rename = "v3_2_3")]
    V3_2_3(RtStateV3_2_3),
}

impl RtPacket {
    pub fn version(&self) -> &'static str {
        match self {
            RtPacket::V1_6_7(_) => "v1_6_7",
            RtPacket::V1_8(_) => "v1_8",
            RtPacket::V3_0_1(_) => "v3_0_1",
            RtPacket::V3_2_3(_) => "v3_2_3",
        }
    }
}

/// The fields every generation shares, in the form the publisher consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtSnapshot {
    pub q_actual: Vec<f64>,
    pub qd_actual: Vec<f64>,
    pub i_actual: Vec<f64>,
    pub q_target: Vec<f64>,
    pub qd_target: Vec<f64>,
    pub i_target: Vec<f64>,
    pub tcp_force: [f64; 6],
    pub tcp_speed_actual: CartesianCoord,
    pub tool_vector_actual: CartesianCoord,
    pub motor_temperatures: Vec<f64>,
}

impl RtSnapshot {
    pub fn joint_count(&self) -> usize {
        self.q_actual.len()
    }

    /// Fails on the first per-joint array whose length is not `joints`.
    pub fn check_dimensions(&self, joints: usize) -> Result<()> {
        let arrays: [(&str, &[f64]); 7] = [
            ("q_actual", self.q_actual.as_slice()),
            ("qd_actual", self.qd_actual.as_slice()),
            ("i_actual", self.i_actual.as_slice()),
            ("q_target", self.q_target.as_slice()),
            ("qd_target", self.qd_target.as_slice()),
            ("i_target", self.i_target.as_slice()),
            ("motor_temperatures", self.motor_temperatures.as_slice()),
        ];

        for (name, values) in arrays {
            if values.len() != joints {
                return Err(eyre::eyre!(
                    "{} has {} entries, expected {}",
                    name,
                    values.len(),
                    joints
                ));
            }
        }

        Ok(())
    }
}

macro_rules! impl_snapshot_from {
    ($($packet:ty),+ $(,)?) => {
        $(
            impl From<&$packet> for RtSnapshot {
                fn from(state: &$packet) -> Self {
                    Self {
                        q_actual: state.q_actual.to_vec(),
                        qd_actual: state.qd_actual.to_vec(),
                        i_actual: state.i_actual.to_vec(),
                        q_target: state.q_target.to_vec(),
                        qd_target: state.qd_target.to_vec(),
                        i_target: state.i_target.to_vec(),
                        tcp_force: state.tcp_force,
                        tcp_speed_actual: state.tcp_speed_actual,
                        tool_vector_actual: state.tool_vector_actual,
                        motor_temperatures: state.motor_temperatures.to_vec(),
                    }
                }
            }
        )+
    };
}

impl_snapshot_from!(RtStateV1_6_7, RtStateV1_8, RtStateV3_0_1, RtStateV3_2_3);

impl From<&RtPacket> for RtSnapshot {
    fn from(packet: &RtPacket) -> Self {
        match packet {
            RtPacket::V1_6_7(state) => state.into(),
            RtPacket::V1_8(state) => state.into(),
            RtPacket::V3_0_1(state) => state.into(),
            RtPacket::V3_2_3(state) => state.into(),
        }
    }
}
