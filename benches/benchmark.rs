use criterion::measurement::WallTime;
use criterion::BenchmarkId;
use criterion::Throughput;
use criterion::{
    criterion_group, criterion_main, BatchSize, BenchmarkGroup, Criterion, SamplingMode,
};
use rand::distributions::{Bernoulli, Distribution, Uniform};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::Beta;
use reservoir_sampling::unweighted::core::r as reservoir_sample;
use transport_auction::{
    AssignmentAuction, AuctionParams, AuctionSolver, Edge, GeneralAuction, Problem,
    ReverseAuction, SimilarObjectAuction,
};

type UInt = u32;

/// Square instance where supply weights are a permutation of demand weights and the
/// permutation arcs are always present.
fn gen_balanced_input(
    seed: u64,
    size: UInt,
    density: f64,
    max_weight: u32,
    min_value: f64,
    max_value: f64,
) -> Problem<UInt> {
    let mut val_rng = ChaCha8Rng::seed_from_u64(seed);
    let mut filter_rng = ChaCha8Rng::seed_from_u64(seed + 1);

    let between = Uniform::from(min_value..max_value);
    let weights = Uniform::from(1..=max_weight);
    let num_of_arcs_fully_dense = size.pow(2);
    let target_elements_from_prng = ((num_of_arcs_fully_dense as f64) * density) as u32;
    let whether_to_add = Bernoulli::from_ratio(target_elements_from_prng, num_of_arcs_fully_dense)
        .expect("unexpected error");
    let mut ensured_i_to_j = (0..size).collect::<Vec<UInt>>();
    ensured_i_to_j.as_mut_slice().shuffle(&mut filter_rng);

    let demand: Vec<f64> = (0..size)
        .map(|_| weights.sample(&mut val_rng) as f64)
        .collect();
    let mut supply = vec![0.; size as usize];
    for (i, j) in ensured_i_to_j.iter().enumerate() {
        supply[*j as usize] = demand[i];
    }
    let arcs = (0..size)
        .map(|i| {
            (0..size)
                .filter(|j| {
                    whether_to_add.sample(&mut filter_rng) || ensured_i_to_j[i as usize] == *j
                })
                .map(|j| Edge::new(between.sample(&mut val_rng), i, j))
                .collect()
        })
        .collect();
    Problem {
        seed,
        demand,
        supply,
        arcs,
    }
}

/// Unit weights with a fixed number of arcs per demand node among many supply nodes.
fn gen_asymmetric_input(
    seed: u64,
    num_of_people: UInt,
    num_of_objects: UInt,
    arcs_per_person: UInt,
    min_value: f64,
    range_width: f64,
) -> Problem<UInt> {
    let mut val_rng = ChaCha8Rng::seed_from_u64(seed);
    let mut filter_rng = ChaCha8Rng::seed_from_u64(seed + 1);
    let beta = Beta::new(3.0, 3.0).unwrap();

    let arcs = (0..num_of_people)
        .map(|i| {
            let mut j_samples = vec![0; arcs_per_person as usize];
            reservoir_sample(0..num_of_objects, j_samples.as_mut_slice(), &mut filter_rng);
            j_samples.sort_unstable();
            j_samples
                .iter()
                .map(|j| {
                    let value = (range_width * beta.sample(&mut val_rng) + min_value).floor();
                    Edge::new(value, i, *j)
                })
                .collect()
        })
        .collect();
    Problem {
        seed,
        demand: vec![1.; num_of_people as usize],
        supply: vec![1.; num_of_objects as usize],
        arcs,
    }
}

fn bench_variant<S: AuctionSolver<UInt> + Clone>(
    group: &mut BenchmarkGroup<WallTime>,
    name: &str,
    parameter: &str,
    problem: &Problem<UInt>,
) {
    let params = AuctionParams::for_problem(&problem.arcs, problem.supply.len());
    let solver = match S::new(&problem.demand, &problem.supply, &problem.arcs, params) {
        Ok(solver) => solver,
        Err(err) => {
            println!("skipping {} {}: {}", name, parameter, err);
            return;
        }
    };
    group.throughput(Throughput::Elements(problem.num_arcs() as u64));
    let benchmark_id = BenchmarkId::new(name, parameter);
    group.bench_with_input(benchmark_id, &solver, |b, solver| {
        b.iter_batched(
            || solver.clone(),
            |mut solver| {
                let solution = solver.solve();
                if solution.is_empty() {
                    println!(
                        "not solved: nits {}, nreductions {}",
                        solution.nits, solution.nreductions
                    )
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_balanced_density_and_size(c: &mut Criterion, max_density_percent: UInt, max_size: UInt) {
    let mut group = c.benchmark_group("balanced_random_degree");
    group.sample_size(10);
    group.sampling_mode(SamplingMode::Flat);

    for density in (1..=max_density_percent).map(|i| i as f64 * 0.01) {
        for size in (250..=max_size).step_by(250) {
            let problem = gen_balanced_input(size as u64, size, density, 4, 500.0, 1000.0);
            let parameter = format!("density {} size {}", density, size);
            bench_variant::<GeneralAuction<UInt>>(&mut group, "general", &parameter, &problem);
            bench_variant::<AssignmentAuction<UInt>>(
                &mut group,
                "assignment",
                &parameter,
                &problem,
            );
            bench_variant::<SimilarObjectAuction<UInt>>(
                &mut group,
                "similar_object",
                &parameter,
                &problem,
            );
            bench_variant::<ReverseAuction<UInt>>(&mut group, "reverse", &parameter, &problem);
        }
    }
    group.finish();
}

fn bench_asymmetric_num_of_people_and_arcs_per_person(
    c: &mut Criterion,
    max_num_of_people: UInt,
    max_arcs_per_person: UInt,
) {
    let mut group = c.benchmark_group("asymmetric_ksparse");
    let num_of_objects = 6000;
    group.sample_size(10);
    group.sampling_mode(SamplingMode::Flat);

    for num_of_people in (100..=max_num_of_people).step_by(200) {
        for arcs_per_person in (16..=max_arcs_per_person).step_by(8) {
            let problem = gen_asymmetric_input(
                num_of_people as u64,
                num_of_people,
                num_of_objects,
                arcs_per_person,
                300.0,
                700.0,
            );
            let parameter = format!(
                "num_of_people {}, num_of_objects {}, arcs_per_person {}",
                num_of_people, num_of_objects, arcs_per_person
            );
            bench_variant::<GeneralAuction<UInt>>(&mut group, "general", &parameter, &problem);
            bench_variant::<AssignmentAuction<UInt>>(
                &mut group,
                "assignment",
                &parameter,
                &problem,
            );
            bench_variant::<SimilarObjectAuction<UInt>>(
                &mut group,
                "similar_object",
                &parameter,
                &problem,
            );
        }
    }
    group.finish();
}

fn bench_balanced_density_5_size_1000(c: &mut Criterion) {
    bench_balanced_density_and_size(c, 5, 1000)
}

fn bench_asymmetric_num_of_people_1000_arcs_per_person_32(c: &mut Criterion) {
    bench_asymmetric_num_of_people_and_arcs_per_person(c, 1000, 32)
}

criterion_group!(
    benches,
    bench_balanced_density_5_size_1000,
    bench_asymmetric_num_of_people_1000_arcs_per_person_32
);
criterion_main!(benches);
