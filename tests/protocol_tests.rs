use satlink::protocol::{
    Command, CommandCode, CommandDeframer, ProtocolError, TelemetryDeframer, TelemetryFrame,
    xor_checksum, CMD_FRAME_LEN, CMD_HEADER, TLM_FRAME_LEN,
};

fn sample_command() -> Command {
    Command {
        code: CommandCode::AdcsSet,
        param1: 2,
        param2: 0xDEAD_BEEF,
        fparam: 90.0,
    }
}

fn sample_telemetry() -> TelemetryFrame {
    TelemetryFrame {
        timestamp: 4242,
        attitude: [90.0, 45.0, 22.5],
        position: [6999.3, 98.2, -42.0],
        temperature: 21,
        power: 87,
        status: 1,
    }
}

#[test]
fn command_round_trip_every_code() {
    let codes = [
        CommandCode::Nop,
        CommandCode::Reset,
        CommandCode::AdcsSet,
        CommandCode::GetTelemetry,
        CommandCode::SetParam,
        CommandCode::Shutdown,
    ];

    for (i, code) in codes.into_iter().enumerate() {
        let cmd = Command {
            code,
            param1: i as u32,
            param2: (i * 1000) as u32,
            fparam: i as f32 * 1.5,
        };
        let decoded = Command::decode(&cmd.encode()).expect("round trip should decode");
        assert_eq!(decoded, cmd);
    }
}

#[test]
fn command_frame_layout() {
    let frame = sample_command().encode();

    assert_eq!(frame.len(), CMD_FRAME_LEN);
    assert_eq!(frame[0], CMD_HEADER);
    assert_eq!(frame[1], CommandCode::AdcsSet as u8);
    assert_eq!(u16::from_le_bytes([frame[2], frame[3]]), 12);
    assert_eq!(frame[16], xor_checksum(&frame[..16]));
}

#[test]
fn telemetry_round_trip() {
    let frame = sample_telemetry();
    let decoded = TelemetryFrame::decode(&frame.encode()).expect("round trip should decode");

    assert_eq!(decoded.timestamp, frame.timestamp);
    assert_eq!(decoded.temperature, frame.temperature);
    assert_eq!(decoded.power, frame.power);
    assert_eq!(decoded.status, frame.status);
    for axis in 0..3 {
        assert!((decoded.attitude[axis] - frame.attitude[axis]).abs() < 1e-6);
        assert!((decoded.position[axis] - frame.position[axis]).abs() < 1e-6);
    }
}

#[test]
fn telemetry_frame_layout() {
    let frame = sample_telemetry().encode();

    assert_eq!(frame.len(), TLM_FRAME_LEN);
    assert_eq!(frame[0], 0xBB);
    assert_eq!(frame[1], 0x01);
    // payload_len counts timestamp through status, checksum excluded
    assert_eq!(frame[2] as usize, TLM_FRAME_LEN - 4);
    assert_eq!(frame[40], xor_checksum(&frame[..40]));
}

#[test]
fn command_single_bit_flips_fail_checksum() {
    let reference = sample_command().encode();

    // Payload bytes: command code and the three parameters. The length and
    // header bytes are validated before the checksum and covered below.
    let payload_bytes = std::iter::once(1usize).chain(4..16);
    for byte in payload_bytes {
        for bit in 0..8 {
            let mut frame = reference;
            frame[byte] ^= 1 << bit;
            assert!(
                matches!(
                    Command::decode(&frame),
                    Err(ProtocolError::InvalidChecksum { .. })
                ),
                "flip of byte {byte} bit {bit} not caught"
            );
        }
    }
}

#[test]
fn command_header_and_length_corruption() {
    let reference = sample_command().encode();

    let mut bad_header = reference;
    bad_header[0] ^= 0x01;
    assert!(matches!(
        Command::decode(&bad_header),
        Err(ProtocolError::InvalidHeader { .. })
    ));

    for byte in [2usize, 3] {
        let mut bad_length = reference;
        bad_length[byte] ^= 0x04;
        assert!(matches!(
            Command::decode(&bad_length),
            Err(ProtocolError::InvalidLength { .. })
        ));
    }
}

#[test]
fn telemetry_single_bit_flips_fail_checksum() {
    let reference = sample_telemetry().encode();

    for byte in 3..40 {
        for bit in 0..8 {
            let mut frame = reference;
            frame[byte] ^= 1 << bit;
            assert!(
                matches!(
                    TelemetryFrame::decode(&frame),
                    Err(ProtocolError::InvalidChecksum { .. })
                ),
                "flip of byte {byte} bit {bit} not caught"
            );
        }
    }
}

#[test]
fn truncated_frames_are_rejected() {
    let cmd_frame = sample_command().encode();
    assert_eq!(
        Command::decode(&cmd_frame[..10]),
        Err(ProtocolError::Truncated { needed: 17, got: 10 })
    );
    assert_eq!(
        Command::decode(&[]),
        Err(ProtocolError::Truncated { needed: 17, got: 0 })
    );

    let tlm_frame = sample_telemetry().encode();
    assert_eq!(
        TelemetryFrame::decode(&tlm_frame[..30]),
        Err(ProtocolError::Truncated { needed: 41, got: 30 })
    );
}

#[test]
fn unknown_command_code_after_valid_checksum() {
    let mut frame = sample_command().encode();
    frame[1] = 9;
    frame[16] = xor_checksum(&frame[..16]);

    assert_eq!(
        Command::decode(&frame),
        Err(ProtocolError::UnknownCommandCode(9))
    );
}

#[test]
fn corrupted_checksum_byte_is_rejected() {
    let mut frame = sample_command().encode();
    frame[16] ^= 0xFF;
    assert!(matches!(
        Command::decode(&frame),
        Err(ProtocolError::InvalidChecksum { .. })
    ));
}

#[test]
fn deframer_waits_for_complete_frame() {
    let frame = sample_command().encode();
    let mut deframer = CommandDeframer::new();

    deframer.extend(&frame[..10]);
    assert!(deframer.next_frame().is_none());

    deframer.extend(&frame[10..]);
    assert_eq!(deframer.next_frame(), Some(Ok(sample_command())));
    assert!(deframer.next_frame().is_none());
}

#[test]
fn deframer_resyncs_after_garbage() {
    let mut deframer = CommandDeframer::new();

    deframer.extend(&[0x00, 0x17, 0xFF]);
    deframer.extend(&sample_command().encode());

    assert_eq!(
        deframer.next_frame(),
        Some(Err(ProtocolError::InvalidHeader { found: 0x00 }))
    );
    assert_eq!(deframer.next_frame(), Some(Ok(sample_command())));
    assert!(deframer.next_frame().is_none());
}

#[test]
fn deframer_drops_bad_frame_and_continues() {
    let mut corrupted = sample_command().encode();
    corrupted[8] ^= 0x40;

    let mut deframer = CommandDeframer::new();
    deframer.extend(&corrupted);
    deframer.extend(&sample_command().encode());

    assert!(matches!(
        deframer.next_frame(),
        Some(Err(ProtocolError::InvalidChecksum { .. }))
    ));
    assert_eq!(deframer.next_frame(), Some(Ok(sample_command())));
}

#[test]
fn telemetry_deframer_splits_back_to_back_frames() {
    let first = sample_telemetry();
    let second = TelemetryFrame {
        timestamp: first.timestamp + 1,
        ..first
    };

    let mut stream = Vec::new();
    stream.extend_from_slice(&first.encode());
    stream.extend_from_slice(&second.encode());

    let mut deframer = TelemetryDeframer::new();
    deframer.extend(&stream);

    assert_eq!(deframer.next_frame(), Some(Ok(first)));
    assert_eq!(deframer.next_frame(), Some(Ok(second)));
    assert!(deframer.next_frame().is_none());
}
