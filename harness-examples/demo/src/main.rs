// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use unit_harness::{
    ensure, ensure_eq, ensure_ne, ensure_near, Registry, TestCase, TestClass, TestDef, TestError,
    TestResult,
};

struct Arithmetic;

impl TestCase for Arithmetic {
    type Context = ();

    fn construct(_: Arc<()>) -> TestResult<Self> {
        Ok(Arithmetic)
    }
}

fn adds(_: &mut Arithmetic) -> TestResult {
    ensure_eq!(2 + 2, 4);
    Ok(())
}

fn divides(_: &mut Arithmetic) -> TestResult {
    ensure_near!(1.0 / 3.0, 0.3333, 0.001);
    Ok(())
}

fn parses(_: &mut Arithmetic) -> TestResult {
    let value: i64 = "-17".parse()?;
    ensure!(value < 0, "{value} should be negative");
    Ok(())
}

/// A stack exercised with one element type per class.
struct Stack<T> {
    items: Vec<T>,
}

impl<T: Default + Clone + PartialEq + std::fmt::Debug + 'static> TestCase for Stack<T> {
    type Context = ();

    fn construct(_: Arc<()>) -> TestResult<Self> {
        Ok(Stack { items: vec![] })
    }

    fn set_up(&mut self) -> TestResult {
        self.items.push(T::default());
        Ok(())
    }

    fn tear_down(&mut self) -> TestResult {
        self.items.clear();
        Ok(())
    }
}

fn pushes<T: Default + Clone + PartialEq + std::fmt::Debug + 'static>(
    stack: &mut Stack<T>,
) -> TestResult {
    stack.items.push(T::default());
    ensure_eq!(stack.items.len(), 2);
    Ok(())
}

fn pops<T: Default + Clone + PartialEq + std::fmt::Debug + 'static>(
    stack: &mut Stack<T>,
) -> TestResult {
    let top = stack.items.pop();
    ensure_eq!(top, Some(T::default()));
    ensure!(stack.items.is_empty());
    Ok(())
}

fn stack<T: Default + Clone + PartialEq + std::fmt::Debug + 'static>() -> TestClass<Stack<T>> {
    TestClass::new("Stack")
        .parameterized::<T>()
        .test("pushes", pushes::<T>)
        .test("pops", pops::<T>)
}

/// A cache shared by every test of the class, built once per class run.
struct Cache {
    shared: Arc<Mutex<HashMap<String, String>>>,
    key: String,
}

impl TestCase for Cache {
    type Context = Mutex<HashMap<String, String>>;

    fn construct(shared: Arc<Self::Context>) -> TestResult<Self> {
        let key = format!("entry-{}", shared.lock().map_err(TestError::msg)?.len());
        Ok(Cache { shared, key })
    }

    fn destruct(self) -> TestResult {
        ensure!(!self.key.is_empty());
        Ok(())
    }
}

fn stores(cache: &mut Cache) -> TestResult {
    let mut entries = cache.shared.lock().map_err(TestError::msg)?;
    entries.insert(cache.key.clone(), String::from("value"));
    ensure_ne!(entries.len(), 0);
    Ok(())
}

fn waits(_: &mut Cache) -> TestResult {
    thread::sleep(Duration::from_millis(50));
    Ok(())
}

fn main() {
    let mut registry = Registry::new();
    registry
        .register(
            TestClass::<Arithmetic>::new("Arithmetic")
                .test("adds", adds)
                .test("divides", divides)
                .test("parses", parses),
        )
        .register(stack::<u32>())
        .register(stack::<String>())
        .register(
            TestClass::<Cache>::with_context("Cache", || Mutex::new(HashMap::new()))
                .test("stores", stores)
                .add(TestDef::new("waits", waits).timeout(2.0))
                .add(TestDef::new("evicts", stores).skipped("eviction is not implemented")),
        );

    std::process::exit(unit_harness::run_main(&registry));
}
