//! dragonlink-gen - test traffic for DragonLink receivers
//!
//! Emits drone telemetry (CoT XML or ESP32 JSON) and sensor kit status over
//! UDP, to a multicast group or a plain host, once or on an interval.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, ValueEnum};
use dragonlink_cot::{
    status_to_cot_envelope, status_to_xml, telemetry_to_xml, PilotLocation, StatusRecord,
    TelemetryRecord,
};
use serde_json::json;
use std::io::Write;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use uuid::Uuid;

/// Generate DragonLink test traffic
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Destination group or host
    #[arg(long, default_value = "239.3.2.1")]
    host: IpAddr,

    /// Port for telemetry payloads
    #[arg(long, default_value = "6969")]
    telemetry_port: u16,

    /// Port for status payloads
    #[arg(long, default_value = "4225")]
    status_port: u16,

    /// Which payloads to send
    #[arg(long, value_enum, default_value = "all")]
    kind: PayloadKind,

    /// Number of simulated drones
    #[arg(long, default_value = "3")]
    drones: usize,

    /// Base latitude in decimal degrees
    #[arg(long, default_value = "35.0")]
    lat: f64,

    /// Base longitude in decimal degrees
    #[arg(long, default_value = "-106.0")]
    lon: f64,

    /// Sensor kit serial number (random if not given)
    #[arg(long)]
    serial: Option<String>,

    /// Rounds to send; 0 keeps sending until interrupted
    #[arg(long, default_value = "1")]
    rounds: u64,

    /// Interval between rounds in milliseconds
    #[arg(long, default_value = "1000")]
    interval: u64,

    /// Multicast TTL
    #[arg(long, default_value = "1")]
    ttl: u32,

    /// Print payloads instead of sending them
    #[arg(long)]
    stdout: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PayloadKind {
    /// CoT XML drone events
    Telemetry,
    /// ESP32 JSON drone reports
    Esp32,
    /// Native `<status>` documents
    Status,
    /// `b-m-p-s-m` CoT events with stats in the remarks
    StatusCot,
    /// Everything above
    All,
}

impl PayloadKind {
    fn includes(self, other: PayloadKind) -> bool {
        self == PayloadKind::All || self == other
    }
}

struct Payload {
    port: u16,
    label: &'static str,
    data: String,
}

struct TrafficGenerator {
    args: Args,
    serial: String,
    socket: Option<UdpSocket>,
}

impl TrafficGenerator {
    fn new(args: Args) -> Result<Self> {
        let serial = args
            .serial
            .clone()
            .unwrap_or_else(|| format!("wardragon-{}", &Uuid::new_v4().simple().to_string()[..8]));

        let socket = if args.stdout {
            None
        } else {
            Some(open_socket(&args)?)
        };

        Ok(Self {
            args,
            serial,
            socket,
        })
    }

    fn drone(&self, index: usize, round: u64) -> TelemetryRecord {
        let now = Utc::now();
        let id = format!("DRONE{}", 100 + index);
        // Each drone drifts north-east a little every round
        let drift = round as f64 * 0.0001;
        let lat = self.args.lat + index as f64 * 0.001 + drift;
        let lon = self.args.lon + index as f64 * 0.001 + drift;

        let mut record = TelemetryRecord::new(format!("drone-{}", id), "a-f-G-U-C", lat, lon);
        record.hae = 100.0 + index as f64 * 10.0;
        record.how = "m-g".to_string();
        record.time = Some(now);
        record.start = Some(now);
        record.stale = Some(now + Duration::minutes(5));
        record.detail.device_id = Some(id.clone());
        record.detail.id_type = Some("Serial Number (ANSI/CTA-2063-A)".to_string());
        record.detail.description = Some(format!("UAV {} operational", id));
        record.detail.speed = Some(5.0 + index as f64);
        record.detail.vertical_speed = Some(0.5);
        record.detail.altitude = Some(record.hae);
        record.detail.height = Some(50.0);
        record.detail.pilot_location = Some(PilotLocation {
            lat: self.args.lat - 0.001,
            lon: self.args.lon - 0.001,
        });
        record
    }

    fn esp32(&self, drone: &TelemetryRecord, index: usize) -> String {
        let id = drone.detail.device_id.clone().unwrap_or_default();
        json!({
            "index": index,
            "runtime": 0,
            "Basic ID": {
                "id": id,
                "id_type": "Serial Number (ANSI/CTA-2063-A)",
            },
            "Location/Vector Message": {
                "latitude": drone.lat,
                "longitude": drone.lon,
                "speed": drone.detail.speed.unwrap_or_default(),
                "vert_speed": drone.detail.vertical_speed.unwrap_or_default(),
                "geodetic_altitude": drone.hae,
                "height_agl": drone.detail.height.unwrap_or_default(),
            },
            "Self-ID Message": {
                "text": drone.detail.description.clone().unwrap_or_default(),
            },
            "System Message": {
                "latitude": drone.detail.pilot_location.map(|p| p.lat).unwrap_or_default(),
                "longitude": drone.detail.pilot_location.map(|p| p.lon).unwrap_or_default(),
            },
        })
        .to_string()
    }

    fn status(&self, round: u64) -> StatusRecord {
        const MB: u64 = 1024 * 1024;
        let mut record = StatusRecord::new(self.serial.clone());
        record.timestamp = Utc::now().timestamp_millis() as f64 / 1000.0;
        record.gps.latitude = self.args.lat;
        record.gps.longitude = self.args.lon;
        record.gps.altitude = 1600.0;

        let stats = &mut record.system_stats;
        stats.cpu_usage = 10.0 + (round % 50) as f64;
        stats.temperature = 45.0 + (round % 10) as f64 * 0.5;
        stats.uptime = (round * self.args.interval / 1000) as f64;
        stats.memory.total = 8192 * MB;
        stats.memory.available = 4096 * MB;
        stats.memory.used = stats.memory.total - stats.memory.available;
        stats.memory.percent = 50.0;
        stats.disk.total = 512_000 * MB;
        stats.disk.used = 1024 * MB;
        stats.disk.free = stats.disk.total - stats.disk.used;
        stats.disk.percent = 0.2;
        record
    }

    fn round(&self, round: u64) -> Vec<Payload> {
        let kind = self.args.kind;
        let mut payloads = Vec::new();

        for index in 0..self.args.drones {
            let drone = self.drone(index, round);
            if kind.includes(PayloadKind::Telemetry) {
                payloads.push(Payload {
                    port: self.args.telemetry_port,
                    label: "telemetry",
                    data: telemetry_to_xml(&drone),
                });
            }
            if kind.includes(PayloadKind::Esp32) {
                payloads.push(Payload {
                    port: self.args.telemetry_port,
                    label: "esp32",
                    data: self.esp32(&drone, index),
                });
            }
        }

        let status = self.status(round);
        if kind.includes(PayloadKind::Status) {
            payloads.push(Payload {
                port: self.args.status_port,
                label: "status",
                data: status_to_xml(&status),
            });
        }
        if kind.includes(PayloadKind::StatusCot) {
            payloads.push(Payload {
                port: self.args.telemetry_port,
                label: "status-cot",
                data: status_to_cot_envelope(&status, Utc::now()),
            });
        }

        payloads
    }

    fn emit(&self, payload: &Payload) -> Result<()> {
        match &self.socket {
            Some(socket) => {
                let destination = SocketAddr::new(self.args.host, payload.port);
                socket
                    .send_to(payload.data.as_bytes(), destination)
                    .with_context(|| format!("Failed to send {} payload to {}", payload.label, destination))?;
                if self.args.verbose {
                    eprintln!(
                        "Sent {} bytes ({}) to {}",
                        payload.data.len(),
                        payload.label,
                        destination
                    );
                }
            }
            None => {
                let mut stdout = std::io::stdout();
                writeln!(stdout, "{}", payload.data).context("Failed to write to stdout")?;
            }
        }
        Ok(())
    }

    fn run(&self) -> Result<()> {
        let mut round = 0;
        let mut sent = 0usize;

        while self.args.rounds == 0 || round < self.args.rounds {
            for payload in self.round(round) {
                self.emit(&payload)?;
                sent += 1;
            }
            round += 1;

            if self.args.rounds == 0 || round < self.args.rounds {
                std::thread::sleep(std::time::Duration::from_millis(self.args.interval));
            }
        }

        if self.socket.is_some() {
            println!(
                "Sent {} payload(s) in {} round(s) to {}",
                sent, round, self.args.host
            );
        }
        Ok(())
    }
}

fn open_socket(args: &Args) -> Result<UdpSocket> {
    let domain = match args.host {
        IpAddr::V4(_) => socket2::Domain::IPV4,
        IpAddr::V6(_) => socket2::Domain::IPV6,
    };
    let socket = socket2::Socket::new(domain, socket2::Type::DGRAM, Some(socket2::Protocol::UDP))
        .context("Failed to create UDP socket")?;

    if args.host.is_multicast() {
        match args.host {
            IpAddr::V4(_) => {
                socket
                    .set_multicast_ttl_v4(args.ttl)
                    .context("Failed to set multicast TTL")?;
                socket
                    .set_multicast_loop_v4(true)
                    .context("Failed to enable multicast loopback")?;
            }
            IpAddr::V6(_) => {
                socket
                    .set_multicast_hops_v6(args.ttl)
                    .context("Failed to set multicast hops")?;
            }
        }
    } else if let IpAddr::V4(addr) = args.host {
        if addr.is_broadcast() {
            socket.set_broadcast(true).context("Failed to enable broadcast")?;
        }
    }

    let local: SocketAddr = match args.host {
        IpAddr::V4(_) => "0.0.0.0:0".parse()?,
        IpAddr::V6(_) => "[::]:0".parse()?,
    };
    socket
        .bind(&local.into())
        .context("Failed to bind UDP socket")?;
    Ok(socket.into())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if !(-90.0..=90.0).contains(&args.lat) {
        anyhow::bail!("Latitude must be between -90 and 90");
    }
    if !(-180.0..=180.0).contains(&args.lon) {
        anyhow::bail!("Longitude must be between -180 and 180");
    }
    if args.drones == 0 && matches!(args.kind, PayloadKind::Telemetry | PayloadKind::Esp32) {
        anyhow::bail!("--drones must be at least 1 for drone payloads");
    }

    let generator = TrafficGenerator::new(args)?;
    generator.run()
}
