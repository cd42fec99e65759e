// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Benchmarks for the ledger.
//!
//! Run with: cargo bench
//!
//! Benchmarks include:
//! - Single-threaded deposits, withdrawals and transfers
//! - Parallel deposits on one contended account versus many accounts
//! - Parallel transfers in opposite directions over one pair
//! - Scaling with the number of threads

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use iban_ledger::{Bank, NewAccount};
use rayon::prelude::*;
use rust_decimal::Decimal;

// =============================================================================
// Helper Functions
// =============================================================================

fn iban(index: usize) -> String {
    format!("GR{index:06}")
}

fn bank_with_accounts(count: usize, balance: i64) -> Bank {
    let bank = Bank::new();
    for i in 0..count {
        bank.create_account(&NewAccount::new(
            iban(i),
            format!("AN{i:06}"),
            Decimal::new(balance, 2),
        ))
        .unwrap();
    }
    bank
}

fn cents(amount: i64) -> Decimal {
    Decimal::new(amount, 2)
}

// =============================================================================
// Single-Threaded Benchmarks
// =============================================================================

fn bench_single_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("single");

    group.bench_function("deposit", |b| {
        let bank = bank_with_accounts(1, 0);
        let target = iban(0);
        b.iter(|| bank.deposit(black_box(&target), cents(100)).unwrap())
    });

    group.bench_function("withdraw", |b| {
        let bank = bank_with_accounts(1, i64::MAX / 4);
        let target = iban(0);
        b.iter(|| bank.withdraw(black_box(&target), cents(100)).unwrap())
    });

    group.bench_function("transfer", |b| {
        let bank = bank_with_accounts(2, i64::MAX / 4);
        let (from, to) = (iban(0), iban(1));
        b.iter(|| bank.transfer(black_box(&from), &to, cents(100)).unwrap())
    });

    group.bench_function("balance", |b| {
        let bank = bank_with_accounts(1, 100);
        let target = iban(0);
        b.iter(|| bank.get_balance(black_box(&target)).unwrap())
    });

    group.finish();
}

fn bench_deposit_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("deposit_throughput");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let bank = bank_with_accounts(1, 0);
                let target = iban(0);
                for _ in 0..count {
                    bank.deposit(&target, cents(100)).unwrap();
                }
                black_box(&bank);
            })
        });
    }
    group.finish();
}

// =============================================================================
// Parallel Benchmarks
// =============================================================================

fn bench_parallel_deposits_same_account(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_deposits_same_account");

    for count in [1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let bank = bank_with_accounts(1, 0);
                let target = iban(0);
                (0..count).into_par_iter().for_each(|_| {
                    bank.deposit(&target, cents(100)).unwrap();
                });
                black_box(&bank);
            })
        });
    }
    group.finish();
}

fn bench_parallel_deposits_many_accounts(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_deposits_many_accounts");
    let num_accounts = 256;

    for count in [1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let ibans: Vec<String> = (0..num_accounts).map(iban).collect();
            b.iter(|| {
                let bank = bank_with_accounts(num_accounts, 0);
                (0..count).into_par_iter().for_each(|i| {
                    bank.deposit(&ibans[i % num_accounts], cents(100)).unwrap();
                });
                black_box(&bank);
            })
        });
    }
    group.finish();
}

fn bench_parallel_opposite_transfers(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_opposite_transfers");

    for count in [1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let (a, z) = (iban(0), iban(1));
            b.iter(|| {
                let bank = bank_with_accounts(2, 100_000_000);
                (0..count).into_par_iter().for_each(|i| {
                    let (from, to) = if i % 2 == 0 { (&a, &z) } else { (&z, &a) };
                    bank.transfer(from, to, cents(100)).unwrap();
                });
                black_box(&bank);
            })
        });
    }
    group.finish();
}

fn bench_thread_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("thread_scaling");
    let total_transfers = 10_000;
    let num_accounts = 64;

    for threads in [1, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements(total_transfers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(threads),
            threads,
            |b, &threads| {
                // Configure rayon thread pool for this benchmark
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .unwrap();
                let ibans: Vec<String> = (0..num_accounts).map(iban).collect();

                b.iter(|| {
                    let bank = bank_with_accounts(num_accounts, 100_000_000);
                    pool.install(|| {
                        (0..total_transfers).into_par_iter().for_each(|i| {
                            let from = &ibans[i % num_accounts];
                            let to = &ibans[(i * 7 + 1) % num_accounts];
                            if from != to {
                                bank.transfer(from, to, cents(1)).unwrap();
                            }
                        });
                    });
                    black_box(&bank);
                })
            },
        );
    }
    group.finish();
}

criterion_group!(
    single,
    bench_single_operations,
    bench_deposit_throughput,
);

criterion_group!(
    parallel,
    bench_parallel_deposits_same_account,
    bench_parallel_deposits_many_accounts,
    bench_parallel_opposite_transfers,
);

criterion_group!(scaling, bench_thread_scaling,);

criterion_main!(single, parallel, scaling);
