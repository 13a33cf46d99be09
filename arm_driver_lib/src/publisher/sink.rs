use crate::types::{JointState, Temperature, TransformStamped, TwistStamped, WrenchStamped};
use eyre::Result;

/// Where the real-time publisher sends its messages.
///
/// One method per outbound message kind. An `Err` means the bus did not take
/// the message; the publisher stops at the first one.
pub trait TelemetrySink {
    fn publish_joint_state(&mut self, msg: &JointState) -> Result<()>;

    fn publish_target_joint_state(&mut self, msg: &JointState) -> Result<()>;

    fn publish_wrench(&mut self, msg: &WrenchStamped) -> Result<()>;

    fn publish_tool_velocity(&mut self, msg: &TwistStamped) -> Result<()>;

    fn publish_transform(&mut self, msg: &TransformStamped) -> Result<()>;

    fn publish_temperature(&mut self, msg: &Temperature) -> Result<()>;
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for &mut S {
    fn publish_joint_state(&mut self, msg: &JointState) -> Result<()> {
        (**self).publish_joint_state(msg)
    }

    fn publish_target_joint_state(&mut self, msg: &JointState) -> Result<()> {
        (**self).publish_target_joint_state(msg)
    }

    fn publish_wrench(&mut self, msg: &WrenchStamped) -> Result<()> {
        (**self).publish_wrench(msg)
    }

    fn publish_tool_velocity(&mut self, msg: &TwistStamped) -> Result<()> {
        (**self).publish_tool_velocity(msg)
    }

    fn publish_transform(&mut self, msg: &TransformStamped) -> Result<()> {
        (**self).publish_transform(msg)
    }

    fn publish_temperature(&mut self, msg: &Temperature) -> Result<()> {
        (**self).publish_temperature(msg)
    }
}
