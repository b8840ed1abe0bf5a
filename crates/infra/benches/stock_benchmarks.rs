use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tokio::runtime::Runtime;

use bloodbank_core::{BloodType, DonorId};
use bloodbank_infra::service::now;
use bloodbank_infra::{BloodBank, BloodBankStore, DatabaseConfig, InMemoryStore, SqliteStore};
use bloodbank_registry::{ContactInfo, RegisterDonor};

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn in_memory(rt: &Runtime) -> BloodBank<InMemoryStore> {
    let bank = BloodBank::new(InMemoryStore::new());
    rt.block_on(bank.setup()).unwrap();
    bank
}

fn sqlite(rt: &Runtime) -> BloodBank<SqliteStore> {
    let store = rt
        .block_on(SqliteStore::connect(&DatabaseConfig::in_memory()))
        .unwrap();
    let bank = BloodBank::new(store);
    rt.block_on(bank.setup()).unwrap();
    bank
}

/// One increment followed by the matching decrement, so stock never drifts.
fn adjust_round<S: BloodBankStore>(rt: &Runtime, bank: &BloodBank<S>) {
    rt.block_on(async {
        bank.adjust_stock(BloodType::OPos, black_box(3)).await.unwrap();
        bank.adjust_stock(BloodType::OPos, black_box(-3)).await.unwrap();
    });
}

fn bench_stock_adjustment(c: &mut Criterion) {
    let rt = runtime();
    let memory = in_memory(&rt);
    let sqlite = sqlite(&rt);

    let mut group = c.benchmark_group("stock_adjustment");
    group.throughput(Throughput::Elements(2));
    group.bench_function("in_memory", |b| b.iter(|| adjust_round(&rt, &memory)));
    group.bench_function("sqlite_memory", |b| b.iter(|| adjust_round(&rt, &sqlite)));
    group.finish();
}

fn bench_rejected_overdraw(c: &mut Criterion) {
    let rt = runtime();
    let sqlite = sqlite(&rt);

    c.bench_function("sqlite_rejected_overdraw", |b| {
        b.iter(|| {
            let result = rt.block_on(sqlite.adjust_stock(BloodType::ANeg, black_box(-1)));
            assert!(result.is_err());
        })
    });
}

fn bench_donor_listing(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("donor_listing");

    for donors in [10usize, 100, 1000] {
        let bank = sqlite(&rt);
        rt.block_on(async {
            for i in 0..donors {
                let blood_type = BloodType::ALL[i % BloodType::ALL.len()];
                bank.register_donor(&RegisterDonor {
                    donor_id: DonorId::parse(&format!("D-{i}")).unwrap(),
                    name: format!("Donor {i:04}"),
                    age: 30,
                    blood_type,
                    contact: ContactInfo {
                        phone: "0300-1234567".to_string(),
                        address: "12 Canal Road".to_string(),
                        email: None,
                    },
                    last_donation: None,
                    occurred_at: now(),
                })
                .await
                .unwrap();
            }
        });

        group.throughput(Throughput::Elements(donors as u64));
        group.bench_with_input(BenchmarkId::new("by_blood_type", donors), &donors, |b, _| {
            b.iter(|| rt.block_on(bank.list_donors(Some(black_box(BloodType::OPos)))).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("counts", donors), &donors, |b, _| {
            b.iter(|| rt.block_on(bank.donor_counts()).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_stock_adjustment,
    bench_rejected_overdraw,
    bench_donor_listing
);
criterion_main!(benches);
