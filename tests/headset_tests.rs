//! Headset facade behavior against an in-memory device directory

use headset_pnp_status::error::AppError;
use headset_pnp_status::headset::{Headset, HeadsetStatus};
use headset_pnp_status::pnp::property::{
    PropertyData, BATTERY_LEVEL, IS_CONNECTED, LAST_CONNECTED_TIME,
};
use headset_pnp_status::pnp::traits::mocks::{DeviceAction, MockDevice, MockDeviceDirectory};
use headset_pnp_status::pnp::DeviceEntity;
use headset_pnp_status::settings::HeadsetConfig;
use std::time::Duration;

const HANDS_FREE: &str = "WH-1000XM4 Hands-Free AG";
const HEADPHONES: &str = "WH-1000XM4";

fn hands_free(battery: Option<u8>) -> MockDevice {
    let device = MockDevice::new(HANDS_FREE, "System");
    match battery {
        Some(level) => device.with_property(BATTERY_LEVEL, PropertyData::Byte(level)),
        None => device.with_empty_property(BATTERY_LEVEL),
    }
}

fn headphones(connected: Option<bool>) -> MockDevice {
    let device = MockDevice::new(HEADPHONES, "Bluetooth");
    match connected {
        Some(c) => device.with_property(IS_CONNECTED, PropertyData::Boolean(c)),
        None => device.with_empty_property(IS_CONNECTED),
    }
}

/// Headset with three Bluetooth sub-devices plus unrelated records
fn inventory() -> MockDeviceDirectory {
    MockDeviceDirectory::new()
        .with_device(hands_free(Some(70)))
        .with_device(headphones(Some(true)))
        .with_device(MockDevice::new("WH-1000XM4 Avrcp Transport", "Bluetooth"))
        .with_device(MockDevice::new("Headphones (WH-1000XM4)", "AudioEndpoint"))
        .with_device(MockDevice::new("WH-1000XM4 Stereo", "Bluetooth"))
        .with_device(MockDevice::new("Galaxy Buds", "Bluetooth"))
}

fn actions(directory: &MockDeviceDirectory) -> Vec<(String, DeviceAction)> {
    directory
        .calls()
        .into_iter()
        .map(|c| (c.device, c.action))
        .collect()
}

#[test]
fn test_create_with_default_patterns() {
    let directory = inventory();
    let headset = Headset::create(&directory).expect("Default patterns should resolve");

    assert_eq!(headset.hands_free().friendly_name(), HANDS_FREE);
    assert_eq!(headset.headphones().friendly_name(), HEADPHONES);
    assert_eq!(headset.battery_level(), 70);
    assert!(headset.connected().unwrap());
}

#[test]
fn test_default_patterns_match_sibling_variant() {
    let directory = MockDeviceDirectory::new()
        .with_device(MockDevice::new("WF-1000XM5 Hands-Free AG", "System"))
        .with_device(MockDevice::new("WF-1000XM5", "Bluetooth"));

    assert!(Headset::create(&directory).is_ok());
}

#[test]
fn test_missing_hands_free_short_circuits() {
    let directory = inventory();
    let result = Headset::create_by(&directory, Some("WH-9999 Hands-Free AG"), Some(HEADPHONES));

    match result {
        Err(AppError::EntityNotResolved(name)) => assert_eq!(name, "WH-9999 Hands-Free AG"),
        Err(other) => panic!("Unexpected error: {}", other),
        Ok(_) => panic!("Construction should fail"),
    }
    assert!(Headset::create_by(&directory, Some("nope"), None)
        .err()
        .map(|e| e.to_string().contains("nope"))
        .unwrap_or(false));
    // Headphones were never looked up
    assert_eq!(directory.lookups(), vec!["WH-9999 Hands-Free AG", "nope"]);
}

#[test]
fn test_missing_headphones_names_headphones() {
    let directory = inventory();
    let err = Headset::create_by(&directory, Some(HANDS_FREE), Some("WH-9999"))
        .err()
        .expect("Construction should fail");

    assert!(matches!(&err, AppError::EntityNotResolved(name) if name == "WH-9999"));
    assert!(err.to_string().contains("WH-9999"));
    assert_eq!(directory.lookups(), vec![HANDS_FREE, "WH-9999"]);
}

#[test]
fn test_ambiguous_name_fails_resolution() {
    let directory = inventory().with_device(MockDevice::new("WH-1000XM5", "Bluetooth"));
    let err = Headset::create(&directory).err().expect("Ambiguous pattern should fail");
    assert!(matches!(err, AppError::EntityNotResolved(name) if name == "W_-1000XM_"));
}

#[test]
fn test_battery_defaults_to_zero() {
    let directory = MockDeviceDirectory::new()
        .with_device(hands_free(None))
        .with_device(headphones(Some(false)));
    let headset = Headset::create(&directory).unwrap();
    assert_eq!(headset.battery_level(), 0);

    // A failed read is swallowed as well
    let failing = MockDeviceDirectory::new()
        .with_device(MockDevice::new(HANDS_FREE, "System").failing_reads())
        .with_device(headphones(Some(false)));
    let headset = Headset::create(&failing).unwrap();
    assert_eq!(headset.battery_level(), 0);
}

#[test]
fn test_connected_null_payload_is_false() {
    let directory = MockDeviceDirectory::new()
        .with_device(hands_free(Some(10)))
        .with_device(headphones(None));
    let headset = Headset::create(&directory).unwrap();

    assert!(!headset.connected().expect("Null payload is not an error"));
}

#[test]
fn test_connected_read_failure_propagates() {
    let directory = MockDeviceDirectory::new()
        .with_device(hands_free(Some(10)))
        .with_device(MockDevice::new(HEADPHONES, "Bluetooth").failing_reads());
    let headset = Headset::create(&directory).unwrap();

    assert!(matches!(headset.connected(), Err(AppError::PropertyReadFailed(_))));
    // Battery on the other persona is unaffected
    assert_eq!(headset.battery_level(), 10);
}

#[test]
fn test_last_connected_time_from_cim_string() {
    let directory = MockDeviceDirectory::new()
        .with_device(hands_free(Some(10)))
        .with_device(headphones(Some(false)).with_property(
            LAST_CONNECTED_TIME,
            PropertyData::String("20240117093015.000000+060".to_string()),
        ));
    let headset = Headset::create(&directory).unwrap();

    let at = headset.last_connected_time().expect("Timestamp should parse");
    assert_eq!(at.to_rfc3339(), "2024-01-17T08:30:15+00:00");
}

#[test]
fn test_last_connected_time_unavailable_while_connected() {
    // Property missing entirely
    let directory = inventory();
    let headset = Headset::create(&directory).unwrap();
    let err = headset.last_connected_time().err().expect("Should fail");
    assert!(matches!(err, AppError::PropertyUnavailable(_)));
    assert!(err.to_string().contains("still connected"));

    // Property present but empty
    let directory = MockDeviceDirectory::new()
        .with_device(hands_free(Some(10)))
        .with_device(headphones(Some(true)).with_empty_property(LAST_CONNECTED_TIME));
    let headset = Headset::create(&directory).unwrap();
    assert!(headset
        .last_connected_time()
        .err()
        .map(|e| e.to_string().contains("still connected"))
        .unwrap_or(false));
}

#[test]
fn test_try_connect_cycles_in_order() {
    let directory = inventory();
    let headset = Headset::create(&directory).unwrap();

    headset.try_connect().expect("Connect failed");

    let expected: Vec<(String, DeviceAction)> = [
        "WH-1000XM4",
        "WH-1000XM4 Avrcp Transport",
        "WH-1000XM4 Stereo",
    ]
    .iter()
    .flat_map(|name| {
        vec![
            (name.to_string(), DeviceAction::Disable),
            (name.to_string(), DeviceAction::Enable),
        ]
    })
    .collect();
    assert_eq!(actions(&directory), expected);
}

#[test]
fn test_try_disconnect_disables_twice_in_reverse() {
    let directory = inventory();
    let config = HeadsetConfig {
        disconnect_delay_ms: 20,
        ..HeadsetConfig::default()
    };
    let headset = Headset::create_with_config(&directory, config, None, None).unwrap();

    headset.try_disconnect().expect("Disconnect failed");

    let expected: Vec<(String, DeviceAction)> = [
        "WH-1000XM4 Stereo",
        "WH-1000XM4 Avrcp Transport",
        "WH-1000XM4",
    ]
    .iter()
    .flat_map(|name| {
        vec![
            (name.to_string(), DeviceAction::Disable),
            (name.to_string(), DeviceAction::Disable),
        ]
    })
    .collect();
    assert_eq!(actions(&directory), expected);

    // The pause sits between the two disables of each device
    let calls = directory.calls();
    for pair in calls.chunks(2) {
        assert!(pair[1].at.duration_since(pair[0].at) >= Duration::from_millis(20));
    }
}

#[test]
fn test_try_connect_aborts_on_first_failure() {
    let directory = MockDeviceDirectory::new()
        .with_device(hands_free(Some(50)))
        .with_device(headphones(Some(false)))
        .with_device(MockDevice::new("WH-1000XM4 Avrcp Transport", "Bluetooth").failing_state_changes())
        .with_device(MockDevice::new("WH-1000XM4 Stereo", "Bluetooth"));
    let headset = Headset::create(&directory).unwrap();

    let err = headset.try_connect().err().expect("Connect should fail");
    assert!(matches!(err, AppError::PrivilegeRequired(_)));
    assert!(err.to_string().contains("administrative rights"));

    // Only the first device was cycled
    assert_eq!(
        actions(&directory),
        vec![
            ("WH-1000XM4".to_string(), DeviceAction::Disable),
            ("WH-1000XM4".to_string(), DeviceAction::Enable),
        ]
    );
}

#[test]
fn test_try_disconnect_aborts_on_first_failure() {
    let directory = MockDeviceDirectory::new()
        .with_device(hands_free(Some(50)))
        .with_device(headphones(Some(true)))
        .with_device(MockDevice::new("WH-1000XM4 Avrcp Transport", "Bluetooth"))
        .with_device(MockDevice::new("WH-1000XM4 Stereo", "Bluetooth").failing_after(1));
    let config = HeadsetConfig {
        disconnect_delay_ms: 5,
        ..HeadsetConfig::default()
    };
    let headset = Headset::create_with_config(&directory, config, None, None).unwrap();

    let err = headset.try_disconnect().err().expect("Disconnect should fail");
    assert!(matches!(err, AppError::PrivilegeRequired(_)));

    // Last enumerated device goes first; its second disable failed and
    // no earlier device was touched
    assert_eq!(
        actions(&directory),
        vec![("WH-1000XM4 Stereo".to_string(), DeviceAction::Disable)]
    );
}

#[test]
fn test_try_disconnect_fails_before_any_disable() {
    let directory = MockDeviceDirectory::new()
        .with_device(hands_free(Some(50)))
        .with_device(headphones(Some(true)))
        .with_device(MockDevice::new("WH-1000XM4 Stereo", "Bluetooth").failing_state_changes());
    let headset = Headset::create(&directory).unwrap();

    assert!(headset.try_disconnect().is_err());
    assert!(directory.calls().is_empty());
}

#[test]
fn test_explicit_headphones_name_narrows_reconnect() {
    let directory = inventory();
    let headset = Headset::create_by(&directory, None, Some("WH-1000XM4 Stereo")).unwrap();

    headset.try_connect().unwrap();

    assert_eq!(
        actions(&directory),
        vec![
            ("WH-1000XM4 Stereo".to_string(), DeviceAction::Disable),
            ("WH-1000XM4 Stereo".to_string(), DeviceAction::Enable),
        ]
    );
}

#[test]
fn test_reconnect_without_matches_is_noop() {
    let directory = MockDeviceDirectory::new()
        .with_device(MockDevice::new(HANDS_FREE, "System"))
        .with_device(MockDevice::new(HEADPHONES, "AudioEndpoint"));
    let headset = Headset::create(&directory).unwrap();

    headset.try_connect().unwrap();
    headset.try_disconnect().unwrap();
    assert!(directory.calls().is_empty());
}

#[test]
fn test_pre_resolved_entities_match_name_resolution() {
    let directory = inventory();
    let resolved = Headset::create(&directory).unwrap();

    let wrapped = Headset::from_entities(
        &directory,
        directory.device(HANDS_FREE).unwrap(),
        directory.device(HEADPHONES).unwrap(),
    );

    assert_eq!(wrapped.battery_level(), resolved.battery_level());
    assert_eq!(wrapped.connected().unwrap(), resolved.connected().unwrap());
    // Wrapping performs no lookups of its own
    assert_eq!(directory.lookups().len(), 2);
}

#[test]
fn test_status_snapshot() {
    let directory = inventory();
    let headset = Headset::create(&directory).unwrap();

    let status = HeadsetStatus::read(&headset).unwrap();
    assert_eq!(status.battery_level, 70);
    assert!(status.connected);
    assert!(status.last_connected.is_none());

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["battery_level"], 70);
    assert_eq!(json["headphones"], HEADPHONES);
    assert!(json["last_connected"].is_null());
    assert!(status.to_string().contains("Battery:        70%"));
}
