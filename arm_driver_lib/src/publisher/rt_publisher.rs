//! Turns one real-time state snapshot into the driver's outbound messages.
//!
//! Publishing order per snapshot:
//!
//! 1. actual joint state, then wrench (skipped in reduced telemetry mode)
//! 2. target joint state
//! 3. tool velocity
//! 4. base -> tool transform
//! 5. one temperature per joint
//!
//! The first rejected publish ends the run. Everything after it, including
//! the joint temperatures, is not sent for that snapshot.

use crate::publisher::TelemetrySink;
use crate::types::{
    Header, JointState, PublisherConfig, ResolvedNames, RtPacket, RtSnapshot, RtStateV1_6_7,
    RtStateV1_8, RtStateV3_0_1, RtStateV3_2_3, Temperature, Time, Transform, TransformStamped,
    Twist, TwistStamped, Vector3, Wrench, WrenchStamped,
};
use crate::utils::rotation_vector_to_quaternion;
use eyre::{Result, WrapErr};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    JointState,
    Wrench,
    TargetJointState,
    ToolVelocity,
    Transform,
    Temperature,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::JointState => "joint state",
            Stage::Wrench => "wrench",
            Stage::TargetJointState => "target joint state",
            Stage::ToolVelocity => "tool velocity",
            Stage::Transform => "tool transform",
            Stage::Temperature => "joint temperature",
        };
        write!(f, "{}", name)
    }
}

pub struct RtPublisher<S> {
    names: ResolvedNames,
    reduced_telemetry: bool,
    sink: S,
}

impl<S: TelemetrySink> RtPublisher<S> {
    pub fn new(config: &PublisherConfig, sink: S) -> Self {
        Self {
            names: config.resolved(),
            reduced_telemetry: config.reduced_telemetry,
            sink,
        }
    }

    pub fn names(&self) -> &ResolvedNames {
        &self.names
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn consume_v1_6_7(&mut self, state: &RtStateV1_6_7) -> bool {
        self.try_consume_v1_6_7(state, Time::now()).is_ok()
    }

    pub fn consume_v1_8(&mut self, state: &RtStateV1_8) -> bool {
        self.try_consume_v1_8(state, Time::now()).is_ok()
    }

    pub fn consume_v3_0_1(&mut self, state: &RtStateV3_0_1) -> bool {
        self.try_consume_v3_0_1(state, Time::now()).is_ok()
    }

    pub fn consume_v3_2_3(&mut self, state: &RtStateV3_2_3) -> bool {
        self.try_consume_v3_2_3(state, Time::now()).is_ok()
    }

    pub fn consume(&mut self, packet: &RtPacket) -> bool {
        self.try_consume(packet, Time::now()).is_ok()
    }

    pub fn try_consume_v1_6_7(&mut self, state: &RtStateV1_6_7, stamp: Time) -> Result<()> {
        self.try_publish_at(&state.into(), stamp)
    }

    pub fn try_consume_v1_8(&mut self, state: &RtStateV1_8, stamp: Time) -> Result<()> {
        self.try_publish_at(&state.into(), stamp)
    }

    pub fn try_consume_v3_0_1(&mut self, state: &RtStateV3_0_1, stamp: Time) -> Result<()> {
        self.try_publish_at(&state.into(), stamp)
    }

    pub fn try_consume_v3_2_3(&mut self, state: &RtStateV3_2_3, stamp: Time) -> Result<()> {
        self.try_publish_at(&state.into(), stamp)
    }

    /// Routes a packet to its version entry point. Keeps the staged failure
    /// that [`consume`](Self::consume) reduces to a bool.
    pub fn try_consume(&mut self, packet: &RtPacket, stamp: Time) -> Result<()> {
        match packet {
            RtPacket::V1_6_7(state) => self.try_consume_v1_6_7(state, stamp),
            RtPacket::V1_8(state) => self.try_consume_v1_8(state, stamp),
            RtPacket::V3_0_1(state) => self.try_consume_v3_0_1(state, stamp),
            RtPacket::V3_2_3(state) => self.try_consume_v3_2_3(state, stamp),
        }
    }

    pub fn publish(&mut self, snapshot: &RtSnapshot) -> bool {
        self.publish_at(snapshot, Time::now())
    }

    pub fn publish_at(&mut self, snapshot: &RtSnapshot, stamp: Time) -> bool {
        self.try_publish_at(snapshot, stamp).is_ok()
    }

    /// Runs the pipeline, stopping at the first failed publish. The error is
    /// wrapped with the [`Stage`] that failed.
    pub fn try_publish_at(&mut self, snapshot: &RtSnapshot, stamp: Time) -> Result<()> {
        if !self.reduced_telemetry {
            self.publish_joints(snapshot, stamp)
                .wrap_err(Stage::JointState)?;
            self.publish_wrench(snapshot, stamp)
                .wrap_err(Stage::Wrench)?;
        }

        self.publish_target_joints(snapshot, stamp)
            .wrap_err(Stage::TargetJointState)?;
        self.publish_tool(snapshot, stamp)
            .wrap_err(Stage::ToolVelocity)?;
        self.publish_transform(snapshot, stamp)
            .wrap_err(Stage::Transform)?;
        self.publish_temperature(snapshot, stamp)
            .wrap_err(Stage::Temperature)?;

        Ok(())
    }

    fn joint_state(&self, stamp: Time, position: &[f64], velocity: &[f64], effort: &[f64]) -> JointState {
        JointState {
            header: Header::new(stamp, ""),
            name: self.names.joint_names.clone(),
            position: position.to_vec(),
            velocity: velocity.to_vec(),
            effort: effort.to_vec(),
        }
    }

    fn publish_joints(&mut self, snapshot: &RtSnapshot, stamp: Time) -> Result<()> {
        let msg = self.joint_state(
            stamp,
            &snapshot.q_actual,
            &snapshot.qd_actual,
            &snapshot.i_actual,
        );
        self.sink.publish_joint_state(&msg)
    }

    fn publish_target_joints(&mut self, snapshot: &RtSnapshot, stamp: Time) -> Result<()> {
        let msg = self.joint_state(
            stamp,
            &snapshot.q_target,
            &snapshot.qd_target,
            &snapshot.i_target,
        );
        self.sink.publish_target_joint_state(&msg)
    }

    fn publish_wrench(&mut self, snapshot: &RtSnapshot, stamp: Time) -> Result<()> {
        let f = &snapshot.tcp_force;
        let msg = WrenchStamped {
            header: Header::new(stamp, self.names.base_frame.as_str()),
            wrench: Wrench {
                force: Vector3::new(f[0], f[1], f[2]),
                torque: Vector3::new(f[3], f[4], f[5]),
            },
        };
        self.sink.publish_wrench(&msg)
    }

    fn publish_tool(&mut self, snapshot: &RtSnapshot, stamp: Time) -> Result<()> {
        let speed = &snapshot.tcp_speed_actual;
        let msg = TwistStamped {
            header: Header::new(stamp, self.names.base_frame.as_str()),
            twist: Twist {
                linear: Vector3::new(speed.position.x, speed.position.y, speed.position.z),
                angular: Vector3::new(speed.rotation.x, speed.rotation.y, speed.rotation.z),
            },
        };
        self.sink.publish_tool_velocity(&msg)
    }

    fn publish_transform(&mut self, snapshot: &RtSnapshot, stamp: Time) -> Result<()> {
        let tv = &snapshot.tool_vector_actual;
        let msg = TransformStamped {
            header: Header::new(stamp, self.names.base_frame.as_str()),
            child_frame_id: self.names.tool_frame.clone(),
            transform: Transform {
                translation: Vector3::new(tv.position.x, tv.position.y, tv.position.z),
                rotation: rotation_vector_to_quaternion(&tv.rotation),
            },
        };
        self.sink.publish_transform(&msg)
    }

    fn publish_temperature(&mut self, snapshot: &RtSnapshot, stamp: Time) -> Result<()> {
        for (link, &temperature) in self.names.link_names.iter().zip(&snapshot.motor_temperatures) {
            let msg = Temperature {
                header: Header::new(stamp, link.as_str()),
                temperature,
                variance: 0.0,
            };
            self.sink.publish_temperature(&msg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::sink::recording::{Kind, Published, RecordingSink};
    use crate::types::rt_state::fixtures;
    use crate::types::{CartesianCoord, Double3, Quaternion};

    const STAMP: Time = Time {
        sec: 1_700_000_000,
        nanosec: 42,
    };

    fn config(reduced_telemetry: bool) -> PublisherConfig {
        PublisherConfig {
            reduced_telemetry,
            ..PublisherConfig::default()
        }
    }

    fn snapshot() -> RtSnapshot {
        RtSnapshot::from(&fixtures::v1_6_7())
    }

    fn run(config: &PublisherConfig, sink: RecordingSink) -> (bool, RecordingSink) {
        let mut publisher = RtPublisher::new(config, sink);
        let ok = publisher.publish_at(&snapshot(), STAMP);
        (ok, publisher.into_sink())
    }

    fn expected_full_order(joints: usize) -> Vec<Kind> {
        let mut kinds = vec![
            Kind::JointState,
            Kind::Wrench,
            Kind::TargetJointState,
            Kind::ToolVelocity,
            Kind::Transform,
        ];
        kinds.extend(std::iter::repeat(Kind::Temperature).take(joints));
        kinds
    }

    #[test]
    fn test_full_mode_publishes_everything_in_order() {
        let (ok, sink) = run(&config(false), RecordingSink::default());

        assert!(ok);
        assert_eq!(sink.kinds(), expected_full_order(6));
    }

    #[test]
    fn test_reduced_mode_skips_joint_state_and_wrench() {
        let (ok, sink) = run(&config(true), RecordingSink::default());

        assert!(ok);
        let mut expected = vec![Kind::TargetJointState, Kind::ToolVelocity, Kind::Transform];
        expected.extend(std::iter::repeat(Kind::Temperature).take(6));
        assert_eq!(sink.kinds(), expected);
    }

    #[test]
    fn test_wrench_failure_stops_the_pipeline() {
        let (ok, sink) = run(&config(false), RecordingSink::failing_on(Kind::Wrench));

        assert!(!ok);
        assert_eq!(sink.kinds(), vec![Kind::JointState, Kind::Wrench]);
    }

    #[test]
    fn test_joint_state_failure_skips_wrench() {
        let (ok, sink) = run(&config(false), RecordingSink::failing_on(Kind::JointState));

        assert!(!ok);
        assert_eq!(sink.kinds(), vec![Kind::JointState]);
    }

    #[test]
    fn test_transform_failure_drops_temperatures() {
        let (ok, sink) = run(&config(true), RecordingSink::failing_on(Kind::Transform));

        assert!(!ok);
        assert_eq!(
            sink.kinds(),
            vec![Kind::TargetJointState, Kind::ToolVelocity, Kind::Transform]
        );
    }

    #[test]
    fn test_temperature_failure_stops_remaining_joints() {
        let (ok, sink) = run(&config(true), RecordingSink::failing_on(Kind::Temperature));

        assert!(!ok);
        let temperatures = sink
            .kinds()
            .into_iter()
            .filter(|k| *k == Kind::Temperature)
            .count();
        assert_eq!(temperatures, 1);
    }

    #[test]
    fn test_error_names_failed_stage() {
        let mut publisher = RtPublisher::new(&config(false), RecordingSink::failing_on(Kind::ToolVelocity));
        let err = publisher.try_publish_at(&snapshot(), STAMP).unwrap_err();

        assert_eq!(err.to_string(), "tool velocity");
        assert!(format!("{:?}", err).contains("bus rejected ToolVelocity"));
    }

    #[test]
    fn test_joint_state_fields() {
        let (_, sink) = run(&config(false), RecordingSink::default());
        let snapshot = snapshot();

        match (&sink.published[0], &sink.published[2]) {
            (Published::JointState(actual), Published::TargetJointState(target)) => {
                assert_eq!(actual.header.stamp, STAMP);
                assert_eq!(actual.name, config(false).joint_names);
                assert_eq!(actual.position, snapshot.q_actual);
                assert_eq!(actual.velocity, snapshot.qd_actual);
                assert_eq!(actual.effort, snapshot.i_actual);

                assert_eq!(target.name, actual.name);
                assert_eq!(target.position, snapshot.q_target);
                assert_eq!(target.velocity, snapshot.qd_target);
                assert_eq!(target.effort, snapshot.i_target);
            }
            other => panic!("unexpected messages {:?}", other),
        }
    }

    #[test]
    fn test_wrench_layout() {
        let (_, sink) = run(&config(false), RecordingSink::default());

        match &sink.published[1] {
            Published::Wrench(msg) => {
                assert_eq!(msg.header.frame_id, "base");
                assert_eq!(msg.header.stamp, STAMP);
                assert_eq!(msg.wrench.force, Vector3::new(1.0, 2.0, 3.0));
                assert_eq!(msg.wrench.torque, Vector3::new(4.0, 5.0, 6.0));
            }
            other => panic!("expected wrench, got {:?}", other),
        }
    }

    #[test]
    fn test_tool_velocity_and_transform() {
        let (_, sink) = run(&config(true), RecordingSink::default());

        match &sink.published[1] {
            Published::ToolVelocity(msg) => {
                assert_eq!(msg.header.frame_id, "base");
                assert_eq!(msg.twist.linear, Vector3::new(0.01, 0.02, 0.03));
                assert_eq!(msg.twist.angular, Vector3::new(-0.1, -0.2, -0.3));
            }
            other => panic!("expected tool velocity, got {:?}", other),
        }

        match &sink.published[2] {
            Published::Transform(msg) => {
                assert_eq!(msg.header.frame_id, "base");
                assert_eq!(msg.header.stamp, STAMP);
                assert_eq!(msg.child_frame_id, "tool0_controller");
                assert_eq!(msg.transform.translation, Vector3::new(0.4, -0.1, 0.6));
                let half = std::f64::consts::FRAC_PI_4;
                assert!((msg.transform.rotation.z - half.sin()).abs() < 1e-12);
                assert!((msg.transform.rotation.w - half.cos()).abs() < 1e-12);
            }
            other => panic!("expected transform, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_rotation_publishes_identity() {
        let mut snapshot = snapshot();
        snapshot.tool_vector_actual = CartesianCoord {
            position: Double3::new(1.0, 2.0, 3.0),
            rotation: Double3::default(),
        };

        let mut publisher = RtPublisher::new(&config(true), RecordingSink::default());
        assert!(publisher.publish_at(&snapshot, STAMP));

        match &publisher.sink().published[2] {
            Published::Transform(msg) => assert_eq!(msg.transform.rotation, Quaternion::identity()),
            other => panic!("expected transform, got {:?}", other),
        }
    }

    #[test]
    fn test_temperature_fan_out() {
        let config = PublisherConfig {
            joint_names: vec!["j0".into(), "j1".into(), "j2".into()],
            link_names: vec!["l0".into(), "l1".into(), "l2".into()],
            ..PublisherConfig::default()
        };
        let snapshot = RtSnapshot {
            q_actual: vec![0.0; 3],
            qd_actual: vec![0.0; 3],
            i_actual: vec![0.0; 3],
            q_target: vec![0.0; 3],
            qd_target: vec![0.0; 3],
            i_target: vec![0.0; 3],
            tcp_force: [0.0; 6],
            tcp_speed_actual: CartesianCoord::default(),
            tool_vector_actual: CartesianCoord::default(),
            motor_temperatures: vec![40.0, 41.5, 43.0],
        };

        let mut publisher = RtPublisher::new(&config, RecordingSink::default());
        assert!(publisher.publish_at(&snapshot, STAMP));

        let temperatures: Vec<(String, f64)> = publisher
            .sink()
            .published
            .iter()
            .filter_map(|p| match p {
                Published::Temperature(t) => {
                    assert_eq!(t.header.stamp, STAMP);
                    assert_eq!(t.variance, 0.0);
                    Some((t.header.frame_id.clone(), t.temperature))
                }
                _ => None,
            })
            .collect();

        assert_eq!(
            temperatures,
            vec![
                ("l0".to_string(), 40.0),
                ("l1".to_string(), 41.5),
                ("l2".to_string(), 43.0),
            ]
        );
    }

    #[test]
    fn test_prefix_applies_to_frames() {
        let config = PublisherConfig {
            prefix: "right_".to_string(),
            ..PublisherConfig::default()
        };
        let names = RtPublisher::new(&config, RecordingSink::default()).names().clone();
        assert_eq!(names.base_frame, "right_base");
        assert_eq!(names.joint_names[0], "right_shoulder_pan_joint");

        let (_, sink) = run(&config, RecordingSink::default());

        match (&sink.published[4], sink.published.last()) {
            (Published::Transform(tf), Some(Published::Temperature(t))) => {
                assert_eq!(tf.header.frame_id, "right_base");
                assert_eq!(tf.child_frame_id, "right_tool0_controller");
                assert_eq!(t.header.frame_id, "right_wrist_3_link");
            }
            other => panic!("unexpected messages {:?}", other),
        }
    }

    #[test]
    fn test_all_versions_publish_identical_messages() {
        let config = config(false);
        let mut outputs = Vec::new();

        let mut publisher = RtPublisher::new(&config, RecordingSink::default());
        assert!(publisher.try_consume_v1_6_7(&fixtures::v1_6_7(), STAMP).is_ok());
        outputs.push(publisher.into_sink());

        let mut publisher = RtPublisher::new(&config, RecordingSink::default());
        assert!(publisher.try_consume_v1_8(&fixtures::v1_8(), STAMP).is_ok());
        outputs.push(publisher.into_sink());

        let mut publisher = RtPublisher::new(&config, RecordingSink::default());
        assert!(publisher.try_consume_v3_0_1(&fixtures::v3_0_1(), STAMP).is_ok());
        outputs.push(publisher.into_sink());

        let mut publisher = RtPublisher::new(&config, RecordingSink::default());
        assert!(publisher.try_consume_v3_2_3(&fixtures::v3_2_3(), STAMP).is_ok());
        outputs.push(publisher.into_sink());

        let mut publisher = RtPublisher::new(&config, RecordingSink::default());
        assert!(publisher.publish_at(&RtSnapshot::from(&fixtures::v1_6_7()), STAMP));
        outputs.push(publisher.into_sink());

        let encoded: Vec<String> = outputs
            .iter()
            .map(|sink| serde_json::to_string(&sink.published).unwrap())
            .collect();
        assert!(encoded.iter().all(|e| *e == encoded[0]));
        assert_eq!(outputs[0].kinds(), expected_full_order(6));
    }

    #[test]
    fn test_packet_dispatch_matches_version_entry_point() {
        let config = config(false);

        let mut direct = RtPublisher::new(&config, RecordingSink::default());
        assert!(direct.try_consume_v3_0_1(&fixtures::v3_0_1(), STAMP).is_ok());

        let mut dispatched = RtPublisher::new(&config, RecordingSink::default());
        assert!(dispatched
            .try_consume(&RtPacket::V3_0_1(fixtures::v3_0_1()), STAMP)
            .is_ok());

        assert_eq!(direct.sink().published, dispatched.sink().published);
    }

    #[test]
    fn test_consume_entry_points() {
        let mut sink = RecordingSink::default();
        {
            let mut publisher = RtPublisher::new(&config(false), &mut sink);
            assert!(publisher.consume_v1_6_7(&fixtures::v1_6_7()));
            assert!(publisher.consume_v1_8(&fixtures::v1_8()));
            assert!(publisher.consume_v3_0_1(&fixtures::v3_0_1()));
            assert!(publisher.consume_v3_2_3(&fixtures::v3_2_3()));
            assert!(publisher.consume(&RtPacket::V3_2_3(fixtures::v3_2_3())));
            assert!(publisher.try_consume(&RtPacket::V1_8(fixtures::v1_8()), STAMP).is_ok());
        }
        assert_eq!(sink.published.len(), 6 * expected_full_order(6).len());
    }

    #[test]
    fn test_consume_reports_failure() {
        let mut publisher = RtPublisher::new(&config(false), RecordingSink::failing_on(Kind::Temperature));
        assert!(!publisher.consume(&RtPacket::V3_0_1(fixtures::v3_0_1())));
        let err = publisher
            .try_consume(&RtPacket::V1_6_7(fixtures::v1_6_7()), STAMP)
            .unwrap_err();
        assert_eq!(err.to_string(), "joint temperature");
    }
}
