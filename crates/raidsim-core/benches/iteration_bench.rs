use criterion::{black_box, criterion_group, criterion_main, Criterion};
use raidsim_core::actor::DefenseStats;
use raidsim_core::dot::DotDefinition;
use raidsim_core::effect::CastCondition;
use raidsim_core::kit::Kit;
use raidsim_core::outcome::OutcomePolicy;
use raidsim_core::resource::{Regen, ResourceKind, ResourcePoolSpec};
use raidsim_core::rotation::{PriorityEntry, PriorityRotation};
use raidsim_core::spell::{CostModel, DamageFormula, PowerSource, SpellDefinition};
use raidsim_core::stat::{School, Stat, Stats};
use raidsim_core::{run_iterations, run_one_iteration, EncounterSpec, PlayerSpec, RotationSpec, SimOptions, SimSpec, SimTime};

/// A warlock keeping a dot up and filling with a nuke, five minutes long.
fn caster_spec() -> SimSpec {
    let mut kit = Kit::new();
    let corruption = kit.add_dot(
        DotDefinition::new("Corruption", 6, SimTime::from_secs(3), 150.0)
            .with_coefficient(PowerSource::SpellPower, 0.156),
    );
    let apply = kit.add_spell(
        SpellDefinition::new("Corruption")
            .with_school(School::Shadow)
            .with_outcome(OutcomePolicy::Magic)
            .with_cost(CostModel::new(ResourceKind::Mana, 370.0))
            .applying(corruption),
    );
    let bolt = kit.add_spell(
        SpellDefinition::new("Shadow Bolt")
            .with_school(School::Shadow)
            .with_outcome(OutcomePolicy::Magic)
            .with_cost(CostModel::new(ResourceKind::Mana, 420.0))
            .with_cast_time(SimTime::from_millis(2500))
            .with_formula(DamageFormula::flat(544.0, 607.0).with_power(PowerSource::SpellPower, 0.857)),
    );
    let rotation = PriorityRotation::new("affliction")
        .then(PriorityEntry::new(apply).when(CastCondition::DotInactive { dot: corruption }))
        .then_cast(bolt);
    let player = PlayerSpec::new("warlock", kit, RotationSpec::Priority(rotation))
        .with_stats(
            Stats::new()
                .with(Stat::SpellPower, 1200.0)
                .with(Stat::SpellCrit, 0.2)
                .with(Stat::SpellHit, 0.1)
                .with(Stat::SpellHaste, 0.15),
        )
        .with_resource(
            ResourcePoolSpec::full(ResourceKind::Mana, 12_000.0).with_regen(Regen::PerTick {
                amount: 120.0,
                interval: SimTime::from_secs(2),
            }),
        );
    SimSpec::new(
        EncounterSpec::single_target(SimTime::from_secs(300), DefenseStats::raid_boss()),
        vec![player],
    )
}

fn bench_single_iteration(c: &mut Criterion) {
    let spec = caster_spec();
    c.bench_function("single_iteration", |b| {
        b.iter(|| run_one_iteration(black_box(&spec), black_box(42)))
    });
}

fn bench_run_iterations(c: &mut Criterion) {
    let spec = caster_spec();
    let sequential = SimOptions::default().with_iterations(64).sequential();
    let parallel = SimOptions::default().with_iterations(64);

    let mut group = c.benchmark_group("run_iterations_64");
    group.sample_size(20);
    group.bench_function("sequential", |b| b.iter(|| run_iterations(black_box(&spec), &sequential)));
    group.bench_function("parallel", |b| b.iter(|| run_iterations(black_box(&spec), &parallel)));
    group.finish();
}

criterion_group!(benches, bench_single_iteration, bench_run_iterations);
criterion_main!(benches);
