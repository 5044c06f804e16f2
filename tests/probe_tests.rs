// Probe runner: isolation, budgets, and parser behavior

use picontrol::probe::registry::{command, file, reader};
use picontrol::probe::{ProbeDomain, ProbeOutcome, parsers};
use serde_json::json;
use tokio::time::Duration;

const BUDGET: Duration = Duration::from_secs(5);

#[tokio::test]
async fn command_probe_produces_parsed_value() {
    let spec = command(
        ProbeDomain::Software,
        "echo",
        BUDGET,
        &["sh", "-c", "echo hello"],
        parsers::raw_text,
    );
    assert_eq!(
        spec.run().await,
        ProbeOutcome::Ok(json!("hello"))
    );
}

#[tokio::test]
async fn missing_binary_is_unavailable_not_an_error() {
    let spec = command(
        ProbeDomain::Software,
        "missing",
        BUDGET,
        &["definitely-not-a-real-binary-4242"],
        parsers::raw_text,
    );
    match spec.run().await {
        ProbeOutcome::Unavailable(reason) => {
            assert!(reason.contains("command not found"), "reason: {reason}")
        }
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn failing_command_reports_stderr() {
    let spec = command(
        ProbeDomain::Software,
        "fails",
        BUDGET,
        &["sh", "-c", "echo broken >&2; exit 3"],
        parsers::raw_text,
    );
    match spec.run().await {
        ProbeOutcome::Unavailable(reason) => {
            assert!(reason.contains("broken"), "reason: {reason}")
        }
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn overrunning_command_times_out_within_budget() {
    let spec = command(
        ProbeDomain::Software,
        "hangs",
        Duration::from_millis(200),
        &["sleep", "30"],
        parsers::raw_text,
    );
    let started = std::time::Instant::now();
    let outcome = spec.run().await;
    assert_eq!(outcome, ProbeOutcome::TimedOut);
    assert!(
        started.elapsed() < Duration::from_millis(1500),
        "timeout took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn unparseable_output_is_unavailable() {
    // raw_text rejects empty output
    let spec = command(
        ProbeDomain::Software,
        "empty",
        BUDGET,
        &["sh", "-c", "true"],
        parsers::raw_text,
    );
    match spec.run().await {
        ProbeOutcome::Unavailable(reason) => {
            assert!(reason.contains("no usable output"), "reason: {reason}")
        }
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_file_is_unavailable() {
    let spec = file(
        ProbeDomain::Hardware,
        "missing_file",
        BUDGET,
        "/nonexistent/path/for/tests",
        parsers::raw_text,
    );
    match spec.run().await {
        ProbeOutcome::Unavailable(reason) => {
            assert!(reason.contains("not present"), "reason: {reason}")
        }
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn reader_probe_reports_values_and_errors() {
    let ok = reader(ProbeDomain::Network, "ok", BUDGET, || Ok(json!({"n": 1})));
    assert_eq!(ok.run().await, ProbeOutcome::Ok(json!({"n": 1})));

    let err = reader(ProbeDomain::Network, "err", BUDGET, || {
        Err(anyhow::anyhow!("device absent"))
    });
    match err.run().await {
        ProbeOutcome::Unavailable(reason) => assert_eq!(reason, "device absent"),
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

// --- parsers ---

#[test]
fn parses_vcgencmd_temp() {
    let value = parsers::vcgencmd_temp("temp=48.3'C").unwrap();
    assert_eq!(value["cpu_celsius"], json!(48.3));
    assert!(parsers::vcgencmd_temp("garbage").is_none());
}

#[test]
fn parses_vcgencmd_throttled() {
    let value = parsers::vcgencmd_throttled("throttled=0x50000").unwrap();
    assert_eq!(value["throttled"], json!(true));
    let value = parsers::vcgencmd_throttled("throttled=0x0").unwrap();
    assert_eq!(value["throttled"], json!(false));
}

#[test]
fn parses_cpuinfo() {
    let raw = "processor\t: 0\nmodel name\t: ARMv8 Processor rev 3 (v8l)\nprocessor\t: 1\n\
               Hardware\t: BCM2835\nRevision\t: c03111\nSerial\t: 10000000abcdef01\n";
    let value = parsers::cpuinfo(raw).unwrap();
    assert_eq!(value["logical_cores"], json!(2));
    assert_eq!(value["model_name"], json!("ARMv8 Processor rev 3 (v8l)"));
    assert_eq!(value["hardware"], json!("BCM2835"));
    assert_eq!(value["revision"], json!("c03111"));
}

#[test]
fn parses_os_release() {
    let raw = "PRETTY_NAME=\"Raspbian GNU/Linux 12 (bookworm)\"\nNAME=\"Raspbian GNU/Linux\"\n\
               VERSION_ID=\"12\"\nID=raspbian\n";
    let value = parsers::os_release(raw).unwrap();
    assert_eq!(value["pretty_name"], json!("Raspbian GNU/Linux 12 (bookworm)"));
    assert_eq!(value["id"], json!("raspbian"));
}

#[test]
fn parses_alsa_device_listing() {
    let raw = "**** List of PLAYBACK Hardware Devices ****\n\
               card 0: Headphones [bcm2835 Headphones], device 0: bcm2835 Headphones [bcm2835 Headphones]\n\
               card 1: Device [USB PnP Sound Device], device 0: USB Audio [USB Audio]\n";
    let value = parsers::alsa_devices(raw).unwrap();
    let devices = value.as_array().unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0]["card"], json!(0));
    assert_eq!(devices[0]["card_name"], json!("Headphones"));
    assert_eq!(devices[1]["card_description"], json!("USB PnP Sound Device"));
}

#[test]
fn parses_camera_listing() {
    let raw = "Available cameras\n-----------------\n\
               0 : imx219 [3280x2464 10-bit RGGB] (/base/soc/i2c0mux/i2c@1/imx219@10)\n\
               Modes: 'SRGGB10_CSI2P' : 640x480 [206.65 fps - (1000, 752)/1280x960 crop]\n";
    let value = parsers::camera_list(raw).unwrap();
    let cameras = value.as_array().unwrap();
    assert_eq!(cameras.len(), 1);
    assert_eq!(cameras[0]["sensor"], json!("imx219"));
    assert_eq!(cameras[0]["id"], json!(0));

    assert!(parsers::camera_list("no header here").is_none());
}

#[test]
fn parses_default_gateway() {
    let value =
        parsers::default_gateway("default via 192.168.1.1 dev wlan0 proto dhcp metric 600").unwrap();
    assert_eq!(value["via"], json!("192.168.1.1"));
    assert_eq!(value["dev"], json!("wlan0"));
    assert!(parsers::default_gateway("").is_none());
}

#[test]
fn parses_resolv_conf() {
    let value = parsers::dns_servers("# generated\nnameserver 1.1.1.1\nnameserver 8.8.8.8\n").unwrap();
    assert_eq!(value["nameservers"], json!(["1.1.1.1", "8.8.8.8"]));
    assert!(parsers::dns_servers("# empty\n").is_none());
}

#[test]
fn parses_listening_sockets() {
    let raw = "LISTEN 0      128          0.0.0.0:22        0.0.0.0:*\n\
               LISTEN 0      511        127.0.0.1:5000      0.0.0.0:*\n";
    let value = parsers::listening_sockets(raw).unwrap();
    let sockets = value.as_array().unwrap();
    assert_eq!(sockets.len(), 2);
    assert_eq!(sockets[1]["port"], json!(5000));
}

#[test]
fn parses_running_services() {
    let raw = "ssh.service     loaded active running OpenBSD Secure Shell server\n\
               cron.service    loaded active running Regular background program processing daemon\n";
    let value = parsers::running_services(raw).unwrap();
    assert_eq!(value["running"], json!(["ssh", "cron"]));
}

#[test]
fn parses_input_devices() {
    let raw = "I: Bus=0003 Vendor=046d Product=c52b Version=0111\n\
               N: Name=\"Logitech USB Receiver\"\n\
               P: Phys=usb-0000:01:00.0-1.2/input0\n";
    let value = parsers::input_devices(raw).unwrap();
    assert_eq!(value["devices"], json!(["Logitech USB Receiver"]));
}

#[test]
fn parses_wifi_connection() {
    let value = parsers::wifi_connection("no:OtherNet\nyes:HomeNet\n").unwrap();
    assert_eq!(value["ssid"], json!("HomeNet"));
    assert!(parsers::wifi_connection("no:OtherNet\n").is_none());
}

#[test]
fn strips_nulls_from_device_tree_model() {
    let value = parsers::device_tree_model("Raspberry Pi 4 Model B Rev 1.4\0").unwrap();
    assert_eq!(value["model"], json!("Raspberry Pi 4 Model B Rev 1.4"));
}
