use std::path::{Path, PathBuf};

const KBPS_128: u8 = 9;
const KBPS_320: u8 = 14;

// MPEG-1 Layer III, 44.1kHz stereo frame with given bit rate index
fn frame(bit_rate_index: u8, fill: u8) -> Vec<u8> {
    use mp3cat::frame::FrameHeader;

    let header = [0xFF, 0xFB, bit_rate_index << 4, 0x00];
    let mut data = vec![fill; FrameHeader::parse(header).unwrap().frame_length()];
    data[0..4].copy_from_slice(&header);
    data
}

fn frames(bit_rate_index: u8, count: u8) -> Vec<u8> {
    (0..count).flat_map(|i| frame(bit_rate_index, i)).collect()
}

fn id3v2_tag(body: &[u8]) -> Vec<u8> {
    let size = body.len() as u32;
    let mut tag = b"ID3\x04\x00\x00".to_vec();
    tag.extend([
        (size >> 21) as u8 & 0x7F,
        (size >> 14) as u8 & 0x7F,
        (size >> 7) as u8 & 0x7F,
        size as u8 & 0x7F,
    ]);
    tag.extend(body);
    tag
}

fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

#[test]
fn test_cbr_merge() {
    use mp3cat::merge::{MergeStats, Options, merge_files};

    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "a.mp3", &frames(KBPS_128, 3));
    let b = write_file(dir.path(), "b.mp3", &frames(KBPS_128, 2));
    let out = dir.path().join("out.mp3");

    let stats = merge_files(&[&a, &b], &out, &Options::default(), |_| {}).unwrap();

    assert_eq!(
        stats,
        MergeStats {
            frames: 5,
            bytes: 2085,
            files: 2,
            first_bit_rate: Some(128000),
            vbr: false,
        }
    );

    // output is exactly the frames of each input, in order
    let output = std::fs::read(&out).unwrap();
    assert_eq!(output.len(), 2085);
    assert_eq!(output, [frames(KBPS_128, 3), frames(KBPS_128, 2)].concat());
}

#[test]
fn test_vbr_merge() {
    use mp3cat::merge::{Options, merge_files};
    use mp3cat::stream::read_frames;
    use mp3cat::vbr::{VbrHeader, XingHeader};

    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "a.mp3", &frames(KBPS_128, 3));
    let b = write_file(dir.path(), "b.mp3", &frames(KBPS_320, 2));
    let out = dir.path().join("out.mp3");

    let stats = merge_files(&[&a, &b], &out, &Options::default(), |_| {}).unwrap();
    assert!(stats.vbr);
    assert_eq!(stats.frames, 5);
    assert_eq!(stats.bytes, 3 * 417 + 2 * 1044);

    let output = std::fs::read(&out).unwrap();
    assert_eq!(output.len(), 417 + 3339);

    // header frame is shaped like the first 128kbps frame
    assert_eq!(&output[0..4], &[0xFF, 0xFB, 0x90, 0x00]);
    assert_eq!(&output[36..40], b"Xing");
    assert_eq!(&output[40..44], &[0, 0, 0, 3]);
    assert_eq!(&output[44..48], &5u32.to_be_bytes());
    assert_eq!(&output[48..52], &3339u32.to_be_bytes());
    assert_eq!(
        &output[417..],
        [frames(KBPS_128, 3), frames(KBPS_320, 2)].concat().as_slice()
    );

    let decoded = read_frames(output.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(decoded.len(), 6);
    assert_eq!(VbrHeader::detect(&decoded[0]), Some(VbrHeader::Xing));
    assert_eq!(XingHeader::read(&decoded[0]), Some(XingHeader::new(5, 3339)));

    // merging the merged file again replaces its Xing header
    let again = dir.path().join("again.mp3");
    let stats = merge_files(&[&out, &out], &again, &Options::default(), |_| {}).unwrap();
    assert_eq!(stats.frames, 10);
    assert_eq!(stats.bytes, 2 * 3339);

    let output = std::fs::read(&again).unwrap();
    assert_eq!(output.len(), 417 + 2 * 3339);
    assert_eq!(&output[44..48], &10u32.to_be_bytes());
}

#[test]
fn test_vbr_merge_small_frames() {
    use mp3cat::merge::{Options, merge_files};
    use mp3cat::vbr::XingHeader;

    // MPEG-2 Layer III, 22.05kHz stereo frame with given bit rate index
    fn mpeg2_frames(bit_rate_index: u8, count: usize) -> Vec<u8> {
        let mut data = vec![0; if bit_rate_index == 1 { 26 } else { 52 }];
        data[0..4].copy_from_slice(&[0xFF, 0xF3, bit_rate_index << 4, 0x00]);
        data.repeat(count)
    }

    // 8kbps frames are too small to hold an Xing header
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "a.mp3", &mpeg2_frames(1, 2));
    let b = write_file(dir.path(), "b.mp3", &mpeg2_frames(2, 2));
    let out = dir.path().join("out.mp3");

    let mut added = None;
    let stats = merge_files(&[&a, &b], &out, &Options::default(), |event| {
        if let mp3cat::merge::Event::XingHeaderAdded(xing) = event {
            added = Some(xing);
        }
    })
    .unwrap();
    assert!(stats.vbr);
    assert_eq!(stats.frames, 4);
    assert_eq!(stats.bytes, 156);
    assert_eq!(added, Some(XingHeader::new(4, 156)));

    // header frame is shaped like the first 16kbps frame
    let output = std::fs::read(&out).unwrap();
    assert_eq!(output.len(), 52 + 156);
    assert_eq!(&output[0..4], &[0xFF, 0xF3, 0x20, 0x00]);
    assert_eq!(&output[21..25], b"Xing");
    assert_eq!(&output[29..33], &4u32.to_be_bytes());
    assert_eq!(&output[33..37], &156u32.to_be_bytes());
    assert_eq!(
        &output[52..],
        [mpeg2_frames(1, 2), mpeg2_frames(2, 2)].concat().as_slice()
    );
}

#[test]
fn test_tag_transplant() {
    use mp3cat::merge::{Options, merge_files};

    let dir = tempfile::tempdir().unwrap();
    let tag_a = id3v2_tag(b"first tag");
    let tag_b = id3v2_tag(b"second tag");

    let a = write_file(
        dir.path(),
        "a.mp3",
        &[tag_a.as_slice(), &frames(KBPS_128, 3)].concat(),
    );
    let b = write_file(
        dir.path(),
        "b.mp3",
        &[tag_b.as_slice(), &frames(KBPS_320, 2)].concat(),
    );

    // CBR output gets the tag alone
    let out = dir.path().join("cbr.mp3");
    merge_files(
        &[&a, &a],
        &out,
        &Options::default().tag_source(Some(0)),
        |_| {},
    )
    .unwrap();
    assert_eq!(
        std::fs::read(&out).unwrap(),
        [tag_a.as_slice(), &frames(KBPS_128, 3), &frames(KBPS_128, 3)].concat()
    );

    // VBR output gets the tag ahead of the Xing header frame
    let out = dir.path().join("vbr.mp3");
    let stats = merge_files(
        &[&a, &b],
        &out,
        &Options::default().tag_source(Some(1)),
        |_| {},
    )
    .unwrap();
    assert_eq!(stats.bytes, 3339);

    let output = std::fs::read(&out).unwrap();
    assert_eq!(output.len(), tag_b.len() + 417 + 3339);
    assert!(output.starts_with(&tag_b));

    let xing = &output[tag_b.len()..];
    assert_eq!(&xing[0..4], &[0xFF, 0xFB, 0x90, 0x00]);
    assert_eq!(&xing[36..40], b"Xing");
    assert_eq!(&xing[44..48], &5u32.to_be_bytes());

    // a tag source without a tag yields no tag
    let c = write_file(dir.path(), "c.mp3", &frames(KBPS_128, 1));
    let out = dir.path().join("untagged.mp3");
    merge_files(
        &[&a, &c],
        &out,
        &Options::default().tag_source(Some(1)),
        |_| {},
    )
    .unwrap();
    assert_eq!(
        std::fs::read(&out).unwrap(),
        [frames(KBPS_128, 3), frames(KBPS_128, 1)].concat()
    );
}

#[test]
fn test_stripping() {
    use mp3cat::merge::{Options, merge_files};

    let dir = tempfile::tempdir().unwrap();

    let mut xing = frame(KBPS_320, 0);
    xing[36..40].copy_from_slice(b"Info");

    let mut id3v1 = b"TAG".to_vec();
    id3v1.resize(128, b' ');

    let a = write_file(
        dir.path(),
        "a.mp3",
        &[
            id3v2_tag(b"tag").as_slice(),
            &xing,
            &frames(KBPS_128, 2),
            b"\x00\x00\x00\x00",
            &frames(KBPS_128, 1),
            &id3v1,
        ]
        .concat(),
    );
    let out = dir.path().join("out.mp3");

    let stats = merge_files(&[&a], &out, &Options::default(), |_| {}).unwrap();

    // the 320kbps Info frame doesn't count toward the bit rate
    assert!(!stats.vbr);
    assert_eq!(stats.frames, 3);
    assert_eq!(
        std::fs::read(&out).unwrap(),
        [frames(KBPS_128, 2), frames(KBPS_128, 1)].concat()
    );
}

#[test]
fn test_events() {
    use mp3cat::merge::{Event, Options, merge_files};

    let dir = tempfile::tempdir().unwrap();
    let tag = id3v2_tag(b"0123456789");
    let a = write_file(
        dir.path(),
        "a.mp3",
        &[tag.as_slice(), &frames(KBPS_128, 3)].concat(),
    );
    let b = write_file(dir.path(), "b.mp3", &frames(KBPS_320, 2));
    let out = dir.path().join("out.mp3");

    let mut events = Vec::new();
    merge_files(
        &[&a, &b],
        &out,
        &Options::default().tag_source(Some(0)),
        |event| {
            events.push(match event {
                Event::Input(path) => format!("+ {}", path.file_name().unwrap().display()),
                Event::TagTransplanted { source, size } => {
                    format!("tag {size} {}", source.file_name().unwrap().display())
                }
                event => event.to_string(),
            })
        },
    )
    .unwrap();

    assert_eq!(
        events,
        vec![
            "+ a.mp3",
            "skipping 20 byte ID3v2 tag",
            "3 frames appended",
            "+ b.mp3",
            "multiple bit rates detected (128 and 320 kbps)",
            "2 frames appended",
            "added Xing header (5 frames, 3339 bytes)",
            "tag 20 a.mp3",
            "2 files merged",
        ]
    );
}

#[test]
fn test_validation() {
    use mp3cat::Error;
    use mp3cat::merge::{Options, merge_files};

    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "a.mp3", &frames(KBPS_128, 3));
    let b = write_file(dir.path(), "b.mp3", &frames(KBPS_128, 2));
    let out = dir.path().join("out.mp3");

    assert!(matches!(
        merge_files(&[&a, &b], &out, &Options::default().tag_source(Some(2)), |_| {}),
        Err(Error::InvalidSelection(2))
    ));
    assert!(!out.exists());

    assert!(matches!(
        merge_files(&[&a, &b], &b, &Options::default().overwrite(true), |_| {}),
        Err(Error::OutputCollision(_))
    ));

    // the same file by another name collides too
    let aliased = dir.path().join(".").join("a.mp3");
    assert!(matches!(
        merge_files(&[&a, &b], &aliased, &Options::default().overwrite(true), |_| {}),
        Err(Error::OutputCollision(_))
    ));
    assert_eq!(std::fs::read(&a).unwrap(), frames(KBPS_128, 3));

    std::fs::write(&out, b"existing").unwrap();
    assert!(matches!(
        merge_files(&[&a, &b], &out, &Options::default(), |_| {}),
        Err(Error::OutputExists(_))
    ));
    assert_eq!(std::fs::read(&out).unwrap(), b"existing");

    merge_files(&[&a, &b], &out, &Options::default().overwrite(true), |_| {}).unwrap();
    assert_eq!(std::fs::read(&out).unwrap().len(), 2085);
}

#[test]
fn test_missing_input() {
    use mp3cat::Error;
    use mp3cat::merge::{Options, merge_files};

    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "a.mp3", &frames(KBPS_128, 3));
    let missing = dir.path().join("missing.mp3");
    let out = dir.path().join("out.mp3");

    match merge_files(&[&a, &missing], &out, &Options::default(), |_| {}) {
        Err(Error::File(path, _)) => assert_eq!(path, missing),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_empty_inputs() {
    use mp3cat::merge::{Options, merge_files};

    let dir = tempfile::tempdir().unwrap();
    let empty = write_file(dir.path(), "empty.mp3", b"");
    let out = dir.path().join("out.mp3");

    let stats = merge_files(&[&empty, &empty], &out, &Options::default(), |_| {}).unwrap();
    assert_eq!(stats.frames, 0);
    assert_eq!(stats.files, 2);
    assert!(std::fs::read(&out).unwrap().is_empty());

    let none: &[&Path] = &[];
    let out = dir.path().join("none.mp3");
    let stats = merge_files(none, &out, &Options::default(), |_| {}).unwrap();
    assert_eq!(stats.files, 0);
    assert!(std::fs::read(&out).unwrap().is_empty());
}
