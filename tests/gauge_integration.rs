//! End-to-end tests driving the gauge through a mock register bus and the
//! TCP endpoints.

use pisugar_gauge::app::GaugeApp;
use pisugar_gauge::config::{Config, HardwareModel};
use pisugar_gauge::core::types::CapacityLevel;
use pisugar_gauge::devices::create_reader;
use pisugar_gauge::monitor::{Estimator, TickOutcome};
use pisugar_gauge::report::PowerReport;
use pisugar_gauge::streaming::wire;
use pisugar_gauge::streaming::{ControlRequest, ControlResponse, POWER_TOPIC};
use pisugar_gauge::transport::MockBus;
use pisugar_gauge::{ChargeStatus, GaugeState};
use std::io::Read;
use std::net::TcpStream;
use std::time::{Duration, Instant};

fn config(model: &str, monitor: &str) -> Config {
    let text = format!(
        "[device]\nmodel = \"{}\"\n[monitor]\n{}\n[streaming]\n\
         tcp_pub_address = \"127.0.0.1:0\"\ntcp_cmd_address = \"127.0.0.1:0\"\n",
        model, monitor
    );
    Config::from_toml(&text).unwrap()
}

fn pisugar3_bus() -> MockBus {
    let bus = MockBus::new(0x57);
    bus.set_registers(&[
        (0x00, 3),
        (0x01, 0x0f),
        (0x02, 0x80),
        (0x04, 66),
        (0x2a, 64),
        (0x22, 0x0f),
        (0x23, 0x0a),
    ]);
    bus
}

fn read_report(stream: &mut TcpStream) -> PowerReport {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).unwrap();
    let mut body = vec![0u8; u32::from_be_bytes(len_buf) as usize];
    stream.read_exact(&mut body).unwrap();
    let (topic, payload) = wire::split_topic(&body).unwrap();
    assert_eq!(topic, POWER_TOPIC);
    wire::decode(payload).unwrap()
}

/// Read reports until `accept` matches or the deadline passes
fn wait_for_report(stream: &mut TcpStream, accept: impl Fn(&PowerReport) -> bool) -> PowerReport {
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let report = read_report(stream);
        if accept(&report) || Instant::now() > deadline {
            return report;
        }
    }
}

#[test]
fn test_pisugar3_offline_then_recovers() {
    let cfg = config("pisugar3", "history_len = 1");
    let state = GaugeState::new(1);
    let mut estimator = Estimator::new(create_reader(&cfg).unwrap(), 1);
    let mut bus = pisugar3_bus();

    assert_eq!(
        estimator.tick_once(&mut bus, &state).unwrap(),
        TickOutcome::Updated
    );
    let online = state.battery(0).unwrap();
    assert_eq!(online.capacity_pct, 64);
    assert_eq!(online.voltage_uv, 3_850_000);
    assert_eq!(online.temperature_c, 26);
    // USB present but charging disabled
    assert_eq!(online.status, ChargeStatus::Discharging);
    assert!(state.source().external_power_present);

    // Bootloader mode: battery untouched, external power absent
    bus.set_register(0x01, 0x01);
    bus.set_register(0x2a, 10);
    for _ in 0..3 {
        assert_eq!(
            estimator.tick_once(&mut bus, &state).unwrap(),
            TickOutcome::Offline
        );
    }
    assert_eq!(state.battery(0).unwrap(), online);
    assert!(!state.source().external_power_present);

    // Retried automatically on the next tick
    bus.set_register(0x01, 0x0f);
    estimator.tick_once(&mut bus, &state).unwrap();
    let bat = state.battery(0).unwrap();
    assert_eq!(bat.capacity_pct, 10);
    assert_eq!(bat.capacity_level, CapacityLevel::Critical);
    assert!(state.source().external_power_present);
}

#[test]
fn test_read_errors_are_idempotent_ticks() {
    for (model, bus, failing) in [
        ("ip5209", MockBus::new(0x75), 0xa2u8),
        ("ip5312", MockBus::new(0x75), 0x58),
        ("pisugar3", pisugar3_bus(), 0x02),
    ] {
        bus.set_registers(&[(0xa2, 0x10), (0xa3, 0x10), (0x55, 0x10)]);
        bus.set_registers(&[(0xd0, 0x10), (0xd1, 0x10), (0x58, 0x00)]);
        bus.fail_register(failing);

        let cfg = config(model, "");
        let state = GaugeState::new(1);
        let mut estimator = Estimator::new(create_reader(&cfg).unwrap(), 30);
        let before = state.snapshot();

        let mut handle = bus.clone();
        assert!(estimator.tick_once(&mut handle, &state).is_err(), "{}", model);
        assert_eq!(state.snapshot(), before, "{}", model);
    }
}

#[test]
fn test_daemon_publishes_monitor_ticks() {
    let cfg = config("pisugar3", "interval_ms = 20");
    let bus = pisugar3_bus();
    let probe = bus.clone();

    let mut app = GaugeApp::with_bus(cfg, Some(Box::new(bus))).unwrap();
    assert!(app.control_addr().is_none());

    let mut client = TcpStream::connect(app.publisher_addr().unwrap()).unwrap();
    client
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();

    let report = wait_for_report(&mut client, |r| r.batteries[0].capacity == 64);
    assert_eq!(report.model, HardwareModel::DirectRegister);
    assert_eq!(report.batteries.len(), 1);
    assert_eq!(report.batteries[0].capacity, 64);
    assert_eq!(report.batteries[0].manufacturer, "PiSugar");
    assert!(report.mains.online);

    probe.set_register(0x00, 0);
    let report = wait_for_report(&mut client, |r| !r.mains.online);
    assert!(!report.mains.online);
    assert_eq!(report.batteries[0].capacity, 64);

    app.stop_all().unwrap();
    let reads = probe.reads().len();
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(probe.reads().len(), reads);
}

#[test]
fn test_software_battery_over_tcp() {
    let cfg = config("software", "interval_ms = 50");
    let app = GaugeApp::with_bus(cfg, None).unwrap();

    let mut control = TcpStream::connect(app.control_addr().unwrap()).unwrap();
    control
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let mut reports = TcpStream::connect(app.publisher_addr().unwrap()).unwrap();
    reports
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();

    let mut send = |request: ControlRequest| -> ControlResponse {
        wire::write_frame(&mut control, &wire::encode(&request).unwrap()).unwrap();
        let mut body = Vec::new();
        assert!(wire::read_frame(&mut control, &mut body).unwrap());
        wire::decode(&body).unwrap()
    };

    let payload = "capacity0=50\ncapacity1=80\ncharging=1\n".to_string();
    let bytes = payload.len();
    assert_eq!(
        send(ControlRequest::Write { payload }),
        ControlResponse::Written { bytes }
    );

    let report = wait_for_report(&mut reports, |r| r.batteries[1].capacity == 80);
    let (b0, b1) = (&report.batteries[0], &report.batteries[1]);
    assert_eq!((b0.capacity, b0.status, b0.capacity_level), (50, ChargeStatus::Charging, CapacityLevel::Normal));
    assert_eq!((b1.capacity, b1.status, b1.capacity_level), (80, ChargeStatus::Charging, CapacityLevel::High));
    assert_eq!(b0.time_to_empty_avg, 1800);
    assert_eq!(b1.time_to_empty_avg, 2880);
    assert_eq!(b1.model_name, "Fake battery 1");
    assert!(report.mains.online);

    let before = app.state().snapshot();
    assert!(matches!(
        send(ControlRequest::Write {
            payload: "capacity2=10\n".to_string()
        }),
        ControlResponse::Rejected { .. }
    ));
    assert_eq!(app.state().snapshot().batteries, before.batteries);
}

#[test]
fn test_bus_model_without_bus_fails() {
    let cfg = config("ip5209", "");
    assert!(GaugeApp::with_bus(cfg, None).is_err());
}
