use jetblack::prelude::*;
use std::path::Path;
use tempfile::tempdir;

fn vif_command(out: &mut Vec<u8>, code: u8, count: u8, immediate: u16) {
    out.extend_from_slice(&immediate.to_le_bytes());
    out.push(count);
    out.push(code);
}

fn i16s(values: &[i16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// A model file holding one quad drawn as a four-vertex strip.
fn quad_model() -> Vec<u8> {
    let strip = GifTag {
        nloop: 4,
        eop: true,
        pre: true,
        prim: 4,
        flg: GifFlag::Packed,
        nreg: 3,
        regs: vec![2, 1, 5],
    };

    let mut packet = Vec::new();
    vif_command(&mut packet, 0x6C, 1, 0);
    packet.extend_from_slice(&strip.encode());
    vif_command(&mut packet, 0x69, 4, 0);
    packet.extend(i16s(&[0, 32, 0, 16, 32, 0, 32, 32, 0, 48, 32, 0]));
    vif_command(&mut packet, 0x6A, 4, 0);
    packet.extend_from_slice(&[0, 127, 0].repeat(4));
    vif_command(&mut packet, 0x69, 6, 0x4000);
    packet.extend(i16s(&[0, 0, 0, 0, 0, 0, 0, 0x1FF, 0x1FF]));
    packet.extend(i16s(&[3, 0x1FF, 0x1FF, 6, 0x1FF, 0x1FF, 9, 0x1FF, 0x1FF]));
    vif_command(&mut packet, 0x14, 0, 66);
    vif_command(&mut packet, 0x65, 4, 0);
    packet.extend(i16s(&[0, 0, 128, 0, 0, 128, 128, 128]));
    vif_command(&mut packet, 0x00, 0, 0);
    vif_command(&mut packet, 0x14, 0, 68);

    let mut data = vec![0u8; 0x80];
    data[0x12] = 1;
    data[0x28..0x2C].copy_from_slice(&0x80u32.to_le_bytes());
    data[0x2C..0x30].copy_from_slice(&((0x80 + packet.len()) as u32).to_le_bytes());
    data.extend(packet);
    data
}

/// A Dark Alliance animation: two chained bones, bone 1 starts moving at frame 4.
fn walk_animation() -> Vec<u8> {
    let mut data = vec![0u8; 0x20];
    data[0] = 2;
    data[0x08] = 0x20;
    data[0x0C] = 0x18;
    data[0x10] = 0x1E;
    data[0x1F] = 1;
    data.extend(i16s(&[64, 0, 0, 4096, 0, 0, 0]));
    data.extend(i16s(&[0, 64, 0, 4096, 0, 0, 0]));
    data.extend_from_slice(&[4, 0x41, 64, 0, 0]);
    data.extend_from_slice(&[4, 0x41, 0, 0, 0]);
    data.extend_from_slice(&[0, 0x3F]);
    data
}

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn test_model_file_to_mesh() {
    init_logging();
    let options = DecodeOptions::new().with_texture_size(16, 16);
    let meshes = decode_model(&quad_model(), &options.mesh_assembler()).unwrap();

    assert_eq!(meshes.len(), 1);
    let mesh = &meshes[0];
    assert_eq!(mesh.positions.len(), 4);
    assert_eq!(mesh.triangle_count(), 4);
    assert_eq!(mesh.triangle_indices, vec![0, 1, 2, 1, 0, 2, 2, 1, 3, 1, 2, 3]);
    assert_eq!(mesh.uvs[3], glam::Vec2::new(0.5, 0.5));
}

#[test]
fn test_animation_file_fills_every_frame() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("walk.anm");
    std::fs::write(&path, walk_animation()).unwrap();

    let anim = jetblack::formats::anim::read_animation(EngineVersion::DarkAlliance, &path).unwrap();
    assert_eq!(anim.num_frames, 9);
    assert_eq!(anim.per_frame_poses.len(), 18);

    for frame in 0..4 {
        assert_eq!(anim.pose(frame, 1).unwrap().frame, 0);
    }
    let stopped = anim.pose(8, 1).unwrap();
    assert_eq!(stopped.frame, 8);
    assert_eq!(stopped.position.x, 0.5);

    // Child rides on the root's offset.
    let world = anim.fk_pose(8, 1).unwrap();
    assert_eq!(world.position, glam::Vec3::new(1.5, 1.0, 0.0));
}

#[test]
fn test_batch_with_options_file() {
    init_logging();
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    std::fs::write(src.path().join("walk.anm"), walk_animation()).unwrap();
    std::fs::write(src.path().join("broken.anm"), [9u8; 8]).unwrap();

    let config = src.path().join("jetblack.toml");
    std::fs::write(&config, "engine_version = \"dark-alliance\"\n").unwrap();
    let options = DecodeOptions::load(&config).unwrap();

    let files = find_asset_files(src.path(), AssetKind::Anm);
    assert_eq!(files.len(), 2);
    let result = batch_decode(&files, AssetKind::Anm, src.path(), dest.path(), &options, |_| {});
    assert_eq!(result.success_count, 1);
    assert_eq!(result.fail_count, 1);

    let json = std::fs::read_to_string(dest.path().join("walk.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["num_frames"], 9);
    assert_eq!(value["skeleton_def"], serde_json::json!([0, 1]));
}

#[test]
fn test_missing_file_is_io_error() {
    let result = WorldTexFile::open(EngineVersion::ReturnToArms, Path::new("/nonexistent/world.tex"));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_dialog_table_file() {
    let mut data = Vec::new();
    for (name, start) in [("intro", 0i32), ("outro", 0x400)] {
        let mut field = [0u8; 0x40];
        field[..name.len()].copy_from_slice(name.as_bytes());
        data.extend_from_slice(&field);
        data.extend_from_slice(&start.to_le_bytes());
    }
    let dir = tempdir().unwrap();
    let path = dir.path().join("talk.dlg");
    std::fs::write(&path, &data).unwrap();

    let entries = jetblack::formats::scene::read_dialog(&path).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "intro");
    assert_eq!(entries[0].length, Some(0x400));
    assert_eq!(entries[1].length, None);
}
