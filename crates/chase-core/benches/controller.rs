use criterion::{black_box, criterion_group, criterion_main, Criterion};
use neural_chase_core::{ChaseConfig, NeuralController, PlayerPolicy, PolicyKind, Session};

fn benchmark_controller(c: &mut Criterion) {
    let features = [0.0f32, -3.0, 0.0, 3.0];
    let target = [0.0f32, -0.46875];

    let mut nn = NeuralController::new(42);
    c.bench_function("controller_predict", |b| {
        b.iter(|| nn.predict(black_box(&features)));
    });

    let mut nn = NeuralController::new(42);
    c.bench_function("controller_train_step", |b| {
        b.iter(|| nn.train_step(black_box(&features), black_box(&target)));
    });
}

fn benchmark_session(c: &mut Criterion) {
    let config = ChaseConfig::default();
    let mut session = Session::new(config.clone());
    let mut player = PolicyKind::Orbit.build(&config);
    let mut frame = 0u64;

    c.bench_function("session_step", |b| {
        b.iter(|| {
            frame += 1;
            let input = player.position(
                frame,
                config.dt,
                session.pursuer_position(),
                session.bounds(),
            );
            session.step(config.dt, input)
        });
    });
}

criterion_group!(benches, benchmark_controller, benchmark_session);
criterion_main!(benches);
