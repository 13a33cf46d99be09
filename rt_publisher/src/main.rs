use arm_driver_lib::{
    init_tracing, JointState, PublisherConfig, RtPacket, RtPublisher, RtSnapshot, TelemetrySink,
    Temperature, Time, TransformStamped, TwistStamped, WrenchStamped,
};
use dora_node_api::{
    arrow::array::{Array, BinaryArray},
    dora_core::config::DataId,
    DoraNode, Event,
};
use eyre::{Result, WrapErr};
use serde::Serialize;
use std::error::Error;
use tracing::{debug, info, warn};

const STATS_INTERVAL: u64 = 500;

/// Sends each message kind as JSON on its own dora output.
struct DoraSink {
    node: DoraNode,
    joint_states: DataId,
    joint_targets: DataId,
    wrench: DataId,
    tool_velocity: DataId,
    tf: DataId,
    joint_temperature: DataId,
}

impl DoraSink {
    fn new(node: DoraNode) -> Self {
        Self {
            node,
            joint_states: DataId::from("joint_states".to_owned()),
            joint_targets: DataId::from("joint_targets".to_owned()),
            wrench: DataId::from("wrench".to_owned()),
            tool_velocity: DataId::from("tool_velocity".to_owned()),
            tf: DataId::from("tf".to_owned()),
            joint_temperature: DataId::from("joint_temperature".to_owned()),
        }
    }

    fn send<T: Serialize>(node: &mut DoraNode, output_id: &DataId, msg: &T) -> Result<()> {
        let serialized = serde_json::to_vec(msg)?;
        let arrow_data = BinaryArray::from_vec(vec![serialized.as_slice()]);

        node.send_output(output_id.clone(), Default::default(), arrow_data)
            .wrap_err_with(|| format!("Failed to send {}", output_id.as_str()))
    }
}

impl TelemetrySink for DoraSink {
    fn publish_joint_state(&mut self, msg: &JointState) -> Result<()> {
        Self::send(&mut self.node, &self.joint_states, msg)
    }

    fn publish_target_joint_state(&mut self, msg: &JointState) -> Result<()> {
        Self::send(&mut self.node, &self.joint_targets, msg)
    }

    fn publish_wrench(&mut self, msg: &WrenchStamped) -> Result<()> {
        Self::send(&mut self.node, &self.wrench, msg)
    }

    fn publish_tool_velocity(&mut self, msg: &TwistStamped) -> Result<()> {
        Self::send(&mut self.node, &self.tool_velocity, msg)
    }

    fn publish_transform(&mut self, msg: &TransformStamped) -> Result<()> {
        Self::send(&mut self.node, &self.tf, msg)
    }

    fn publish_temperature(&mut self, msg: &Temperature) -> Result<()> {
        Self::send(&mut self.node, &self.joint_temperature, msg)
    }
}

#[derive(Debug, Default)]
struct PublishStats {
    packets: u64,
    failed: u64,
    skipped: u64,
}

impl PublishStats {
    fn log_summary(&self) {
        info!(
            "Packets: {} received, {} failed to publish, {} skipped",
            self.packets, self.failed, self.skipped
        );
    }
}

fn load_config() -> Result<PublisherConfig> {
    let config_path = std::env::var("RT_PUBLISHER_CONFIG")
        .unwrap_or_else(|_| "config/rt_publisher.toml".to_string());

    let mut config = if std::path::Path::new(&config_path).exists() {
        PublisherConfig::load_from_file(&config_path)
            .wrap_err_with(|| format!("Failed to load publisher config from {}", config_path))?
    } else {
        warn!("Config file not found at {}", config_path);
        warn!("Using default UR joint and frame names");
        PublisherConfig::default()
    };

    if let Ok(value) = std::env::var("REDUCED_TELEMETRY") {
        config.reduced_telemetry = matches!(value.to_lowercase().as_str(), "1" | "true" | "yes");
    }

    config.validate()?;
    Ok(config)
}

fn handle_packet(
    publisher: &mut RtPublisher<DoraSink>,
    stats: &mut PublishStats,
    joint_count: usize,
    bytes: &[u8],
) {
    let packet = match serde_json::from_slice::<RtPacket>(bytes) {
        Ok(packet) => packet,
        Err(e) => {
            warn!("Failed to parse rt state packet: {}", e);
            stats.skipped += 1;
            return;
        }
    };

    let snapshot = RtSnapshot::from(&packet);
    if let Err(e) = snapshot.check_dimensions(joint_count) {
        warn!("Dropping {} packet: {}", packet.version(), e);
        stats.skipped += 1;
        return;
    }

    if let Err(e) = publisher.try_consume(&packet, Time::now()) {
        stats.failed += 1;
        warn!("Publishing {} packet stopped early: {:#}", packet.version(), e);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let _guard = init_tracing();

    info!("Starting rt state publisher node");

    let config = load_config()?;
    let joint_count = config.joint_count();

    info!("Publishing for {} joints", joint_count);
    info!(
        "Reduced telemetry: {}",
        if config.reduced_telemetry {
            "ENABLED"
        } else {
            "DISABLED"
        }
    );

    let (node, mut events) = DoraNode::init_from_env()?;
    let mut publisher = RtPublisher::new(&config, DoraSink::new(node));
    let names = publisher.names();
    info!(
        "Frames: base '{}', tool '{}'",
        names.base_frame, names.tool_frame
    );
    info!("Temperature frames: {}", names.link_names.join(", "));
    let mut stats = PublishStats::default();

    while let Some(event) = events.recv() {
        match event {
            Event::Input {
                id,
                metadata: _,
                data,
            } => match id.as_str() {
                "rt_state" => {
                    if let Some(array) = data.as_any().downcast_ref::<BinaryArray>() {
                        if array.len() > 0 {
                            stats.packets += 1;
                            handle_packet(&mut publisher, &mut stats, joint_count, array.value(0));

                            if stats.packets % STATS_INTERVAL == 0 {
                                debug!("{:?}", stats);
                            }
                        }
                    }
                }
                other => {
                    debug!("Unknown input id: {}", other);
                }
            },

            Event::Stop(_) => {
                info!("Stop event received");
                break;
            }

            _ => {}
        }
    }

    stats.log_summary();
    info!("Rt state publisher shutting down");
    Ok(())
}
