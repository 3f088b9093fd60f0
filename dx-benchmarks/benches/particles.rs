use criterion::{criterion_group, criterion_main, Criterion};
use dx_particles::{
    decor::{
        Decoration, DustDisk, DustDiskConfig, GalaxyBand, GalaxyBandConfig, NebulaFloor,
        NebulaFloorConfig, Primitives, Snow, SnowConfig, Sparkles, SparklesConfig,
    },
    FieldConfig, ParticleField,
};
use dx_shared::Mode;
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;
use strum::IntoEnumIterator;

const FRAME: f32 = 1. / 60.;

fn generate_field(c: &mut Criterion) {
    let config = FieldConfig::default();

    c.bench_function("generate particle field", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(12345);
            black_box(ParticleField::generate(&config, &mut rng));
        });
    });
}

fn step_field(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(12345);
    let base = ParticleField::generate(&FieldConfig::default(), &mut rng);

    for mode in Mode::iter() {
        c.bench_function(&format!("step particle field towards {mode}"), |b| {
            let mut field = base.clone();
            b.iter(|| {
                field.step(mode, FRAME);
                black_box(field.current());
            });
        });
    }
}

fn bench_decoration<D: Decoration>(c: &mut Criterion, name: &str, mut decoration: D) {
    let mut out = Primitives::default();
    let mut elapsed = 0.;

    c.bench_function(&format!("update and emit {name}"), |b| {
        b.iter(|| {
            elapsed += FRAME;
            decoration.update(FRAME, elapsed);
            out.clear();
            decoration.emit(&mut out);
            black_box(&out);
        });
    });
}

fn decorations(c: &mut Criterion) {
    bench_decoration(
        c,
        "nebula floor",
        NebulaFloor::new(NebulaFloorConfig::default(), 1),
    );
    bench_decoration(c, "dust disk", DustDisk::new(DustDiskConfig::default(), 2));
    bench_decoration(
        c,
        "galaxy band",
        GalaxyBand::new(GalaxyBandConfig::default(), 3),
    );
    bench_decoration(c, "snow", Snow::new(SnowConfig::default(), 4));
    bench_decoration(c, "sparkles", Sparkles::new(SparklesConfig::default(), 5));
}

criterion_group!(benches, generate_field, step_field, decorations);
criterion_main!(benches);
