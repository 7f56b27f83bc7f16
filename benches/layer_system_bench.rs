//! Per-frame cost of the layer system with many channels sharing one skeleton.

use std::f32::consts::FRAC_PI_2;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::{Mat4, Quat, Vec3};

use gimbal::animation::{
    AnimatedModel, AnimationClip, AnimationLayer, AnimationLayerSystem, AnimationMask,
    BinaryAnimationChannel, InterpolationMode, JointTrack, KeyframeTrack, ModelMesh,
    ProceduralAnimationChannel, ProceduralJointConfig, Skeleton, Skin,
};

const JOINTS: usize = 64;

fn joint_paths() -> Vec<String> {
    // A flat fan under one root keeps the paths short
    let mut paths = vec!["/bench".to_string()];
    paths.extend((1..JOINTS).map(|i| format!("/bench/j{i}")));
    paths
}

fn build(channels: usize) -> (AnimatedModel, AnimationLayerSystem) {
    let paths = joint_paths();

    let mut clip = AnimationClip::new("sweep");
    for path in &paths {
        let track = KeyframeTrack::new(
            vec![0.0, 1.0],
            vec![Quat::IDENTITY, Quat::from_rotation_y(FRAC_PI_2)],
            InterpolationMode::Linear,
        )
        .expect("valid track");
        clip = clip.with_joint_track(path, JointTrack::default().with_rotation(track));
    }

    let mut model = AnimatedModel::new();
    let skeleton = Skeleton::from_joint_paths(
        &paths,
        vec![Mat4::IDENTITY; JOINTS],
        vec![Mat4::from_translation(Vec3::Y); JOINTS],
        None,
    )
    .expect("valid skeleton");
    let key = model.add_skeleton("bench", skeleton);
    let mesh = model.add_mesh(ModelMesh::new("body").with_skin(Skin::new(&paths)));
    model.bind_mesh_to_skeleton(mesh, key);
    model.add_clip(clip);

    let mut system = AnimationLayerSystem::new(&model);
    let mut layer = AnimationLayer::new("bench");
    for i in 0..channels {
        let joint = &paths[1 + i % (JOINTS - 1)];
        let mask = AnimationMask::from_joints([joint.as_str()]);
        if i % 4 == 3 {
            layer.add_channel(ProceduralAnimationChannel::new(
                format!("p{i}"),
                mask,
                vec![ProceduralJointConfig::new(joint, Vec3::X, 0.5)],
            ));
        } else {
            layer.add_channel(BinaryAnimationChannel::new(format!("b{i}"), mask, 1.0));
        }
    }
    system.register_layer(&model, layer);
    system.force_update_all_poses(&mut model);

    (model, system)
}

fn layer_system_benchmark(c: &mut Criterion) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut group = c.benchmark_group("layer_system_update");

    for channels in [8, 32, 128] {
        group.bench_with_input(BenchmarkId::new("idle", channels), &channels, |b, &n| {
            let (mut model, mut system) = build(n);
            b.iter(|| system.update(&mut model, black_box(0.016)));
        });

        group.bench_with_input(BenchmarkId::new("all_dirty", channels), &channels, |b, &n| {
            let (mut model, mut system) = build(n);
            let ids: Vec<String> = system.channel_ids().into_iter().map(str::to_string).collect();
            let mut t = 0.0_f32;
            b.iter(|| {
                t = (t + 0.01) % 1.0;
                for id in &ids {
                    system.set_channel_value(id, t);
                }
                system.update(&mut model, black_box(0.016));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, layer_system_benchmark);
criterion_main!(benches);
