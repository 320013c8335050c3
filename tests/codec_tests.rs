//! Codec round-trip property test (§8 property 4): `encode(decode(x)) == x`
//! for every fixture of the frame-token set, generalized to arbitrary field
//! values with `proptest` rather than a fixed fixture list.

use proptest::prelude::*;

use iotwx::codec::{decode, encode, FrameType, LoraFrame};

fn arb_sid() -> impl Strategy<Value = String> {
    "[0-9a-f]{16}"
}

/// Sensor and GPS values in practice carry a handful of decimal digits of
/// real precision; rounding here keeps generated fixtures realistic and
/// avoids exercising full `f64` ULP territory the wire format never sees.
fn arb_reading(range: std::ops::Range<f64>) -> impl Strategy<Value = f64> {
    range.prop_map(|x| (x * 10_000.0).round() / 10_000.0)
}

proptest! {
    #[test]
    fn round_trips_ping_pong_keepalive_disconnect_stationinfo(
        sid in arb_sid(),
        variant in 0..5u8,
        ty in prop::option::of(1u8..=2),
        l in prop::option::of(arb_reading(0.0..1.0)),
        rssi in prop::option::of(-120i32..-30),
        rc in prop::option::of(0u32..5),
        to in prop::option::of(arb_sid()),
        r in prop::option::of(any::<bool>()),
        lat in prop::option::of(arb_reading(-90.0..90.0)),
        lon in prop::option::of(arb_reading(-180.0..180.0)),
        altitude in prop::option::of(arb_reading(-50.0..5000.0)),
    ) {
        let frame_type = match variant {
            0 => FrameType::Ping,
            1 => FrameType::Pong,
            2 => FrameType::KeepAlive,
            3 => FrameType::Disconnect,
            _ => FrameType::StationInfo,
        };
        let mut frame = LoraFrame::bare(sid, frame_type);
        frame.ty = ty;
        frame.l = l;
        frame.rssi = rssi;
        frame.rc = rc;
        frame.to = to;
        frame.r = r;
        frame.lat = lat;
        frame.lon = lon;
        frame.altitude = altitude;

        let bytes = encode(&frame);
        let decoded = decode(&bytes).unwrap();
        prop_assert_eq!(decoded, frame);
    }

    #[test]
    fn round_trips_sensor_data(
        sid in arb_sid(),
        sensor in "[a-z0-9]{3,10}",
        measurement in prop_oneof![
            Just("tmp".to_string()),
            Just("rh".to_string()),
            Just("pre".to_string()),
            Just("C02".to_string()),
            "[a-z]{2,6}",
        ],
        value in arb_reading(-1000.0..1000.0),
        to in prop::option::of(arb_sid()),
        rssi in prop::option::of(-120i32..-30),
    ) {
        let mut frame = LoraFrame::bare(sid, FrameType::SensorData);
        frame.s = Some(sensor);
        frame.m = Some(measurement);
        frame.d = Some(value);
        frame.to = to;
        frame.rssi = rssi;

        let bytes = encode(&frame);
        let decoded = decode(&bytes).unwrap();
        prop_assert_eq!(decoded, frame);
    }

    /// Every `F`-type frame missing any of `s`/`m`/`d` is rejected, not
    /// just the specific combinations the unit tests in `frame.rs` cover.
    #[test]
    fn sensor_data_missing_any_required_field_is_malformed(
        sid in arb_sid(),
        has_s in any::<bool>(),
        has_m in any::<bool>(),
        has_d in any::<bool>(),
    ) {
        prop_assume!(!(has_s && has_m && has_d));
        let mut frame = LoraFrame::bare(sid, FrameType::SensorData);
        if has_s {
            frame.s = Some("bme680".to_string());
        }
        if has_m {
            frame.m = Some("tmp".to_string());
        }
        if has_d {
            frame.d = Some(1.0);
        }
        let bytes = encode(&frame);
        prop_assert!(decode(&bytes).is_err());
    }
}
