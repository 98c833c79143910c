//! Benchmarks for the derived views of the todo and user slices.
//!
//! Lists are sized well above what the demo produces to show how filtering,
//! counting and sorting scale.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fake::{Fake, Faker};
use sandbox_stores::model::{Todo, TodoFilter, User, UserSort};
use sandbox_stores::slices::{TodoCommand, TodosState, UsersState};
use std::sync::Arc;

const SIZES: [usize; 2] = [100, 1_000];

fn todos(size: usize) -> TodosState {
    let items: Vec<Todo> = (0..size)
        .map(|i| Todo {
            id: i.to_string(),
            ..Faker.fake()
        })
        .collect();
    let mut state = TodosState::default();
    state.replace(items);
    state
}

fn users(size: usize) -> UsersState {
    let items: Vec<User> = (0..size)
        .map(|i| User {
            id: i.to_string(),
            ..Faker.fake()
        })
        .collect();
    let mut state = UsersState::default();
    state.replace(items);
    state
}

fn bench_todo_views(c: &mut Criterion) {
    let mut group = c.benchmark_group("todo_views");
    for size in SIZES {
        let mut state = todos(size);
        state.apply(TodoCommand::SetFilter(TodoFilter::Active));
        group.bench_with_input(BenchmarkId::new("filtered", size), &state, |b, s| {
            b.iter(|| black_box(s).filtered())
        });
        group.bench_with_input(BenchmarkId::new("stats", size), &state, |b, s| {
            b.iter(|| black_box(s).stats())
        });
        group.bench_with_input(BenchmarkId::new("by_priority", size), &state, |b, s| {
            b.iter(|| black_box(s).by_priority())
        });
    }
    group.finish();
}

fn bench_todo_toggle(c: &mut Criterion) {
    let state = todos(1_000);
    let id = state.items[500].id.clone();
    c.bench_function("todo_toggle_copy_on_write_1000", |b| {
        b.iter(|| {
            let mut next = state.clone();
            next.apply(TodoCommand::Toggle { id: id.clone() });
            black_box(Arc::ptr_eq(&next.items[0], &state.items[0]))
        })
    });
}

fn bench_user_views(c: &mut Criterion) {
    let mut group = c.benchmark_group("user_views");
    for size in SIZES {
        let mut state = users(size);
        state.search = "a".to_string();
        for sort in [UserSort::Name, UserSort::Status] {
            state.sort = sort;
            let label = format!("filtered_{:?}", sort).to_lowercase();
            group.bench_with_input(BenchmarkId::new(label, size), &state, |b, s| {
                b.iter(|| black_box(s).filtered())
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_todo_views, bench_todo_toggle, bench_user_views);
criterion_main!(benches);
