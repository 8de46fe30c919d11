//! Processors used by the engine tests.
//!
//! The `phase*` processors share a caller-supplied [`TestReq`] through the
//! extern `REQ` port and record what they did in it, so a test can tell from
//! the final request which vertices ran and in what combination.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::consts::GLOBAL_PARAMS_KEY;
use crate::config::{Params, ProcessorRegistry};
use crate::engine::PortIo;
use crate::errors::ProcessorError;
use crate::traits::{PortSpec, Processor};

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TestReq {
    pub name: String,
    pub id: Vec<i64>,
    pub strs: Vec<String>,
}

impl TestReq {
    pub(crate) fn new(name: &str, id: &[i64], strs: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            id: id.to_vec(),
            strs: strs.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub(crate) type SharedReq = Mutex<TestReq>;

fn request(io: &PortIo) -> Result<Arc<SharedReq>, ProcessorError> {
    io.input::<SharedReq>("REQ")?
        .ok_or_else(|| ProcessorError::new(1, "REQ not supplied"))
}

/// Overwrites `list[idx]`, or appends when the list is shorter.
fn put<T>(list: &mut Vec<T>, idx: usize, value: T) {
    match list.get_mut(idx) {
        Some(slot) => *slot = value,
        None => list.push(value),
    }
}

/// Seeds the request from its args and publishes the request name as `Mid`.
/// Fails with `fail_code` when that arg is non-zero, after doing its work.
pub(crate) struct Phase0;

#[async_trait]
impl Processor for Phase0 {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::extern_input::<SharedReq>("REQ"),
            PortSpec::output::<String>("Mid"),
        ]
    }

    async fn on_execute(
        &mut self,
        _cancel: &CancellationToken,
        params: &Params,
        io: &mut PortIo,
    ) -> Result<(), ProcessorError> {
        let req = request(io)?;
        let mid = {
            let mut req = req.lock();
            if !params.get_str("name").is_empty() {
                req.name = params.get_str("name").to_string();
            }
            if params.get_i64("id") != 0 {
                put(&mut req.id, 0, params.get_i64("id"));
            }
            if !params.get_str("str").is_empty() {
                put(&mut req.strs, 0, params.get_str("str").to_string());
            }
            req.name.clone()
        };
        io.set_output("Mid", mid)?;

        match params.get_i64("fail_code") {
            0 => Ok(()),
            code => Err(ProcessorError::new(code, "phase0 asked to fail")),
        }
    }
}

/// Renames the request after `Mid` and publishes the `id` arg as `ID`.
pub(crate) struct Phase1;

#[async_trait]
impl Processor for Phase1 {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::extern_input::<SharedReq>("REQ"),
            PortSpec::input::<String>("Mid"),
            PortSpec::output::<i64>("ID"),
        ]
    }

    async fn on_execute(
        &mut self,
        _cancel: &CancellationToken,
        params: &Params,
        io: &mut PortIo,
    ) -> Result<(), ProcessorError> {
        let req = request(io)?;
        let id = params.get_i64("id");
        {
            let mut req = req.lock();
            if let Some(mid) = io.input::<String>("Mid")? {
                req.name = (*mid).clone();
            }
            put(&mut req.id, 0, id);
        }
        io.set_output("ID", id)?;
        Ok(())
    }
}

/// Replaces the request ids with the collected `IDs`, sorted.
pub(crate) struct Phase2;

#[async_trait]
impl Processor for Phase2 {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::extern_input::<SharedReq>("REQ"),
            PortSpec::aggregate::<i64>("IDs"),
            PortSpec::output::<i64>("Total"),
        ]
    }

    async fn on_execute(
        &mut self,
        _cancel: &CancellationToken,
        _params: &Params,
        io: &mut PortIo,
    ) -> Result<(), ProcessorError> {
        let req = request(io)?;
        let mut ids: Vec<i64> = io.aggregate::<i64>("IDs")?.values().map(|v| **v).collect();
        ids.sort_unstable();
        let total = ids.iter().sum::<i64>();
        {
            let mut req = req.lock();
            req.name.clear();
            req.strs.clear();
            req.id = ids;
        }
        io.set_output("Total", total)?;
        Ok(())
    }
}

pub(crate) struct Phase3;

#[async_trait]
impl Processor for Phase3 {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::extern_input::<SharedReq>("REQ")]
    }

    async fn on_execute(
        &mut self,
        _cancel: &CancellationToken,
        _params: &Params,
        io: &mut PortIo,
    ) -> Result<(), ProcessorError> {
        let req = request(io)?;
        let mut req = req.lock();
        req.name = "p3".to_string();
        put(&mut req.id, 1, 4);
        put(&mut req.strs, 0, "s1".to_string());
        Ok(())
    }
}

/// Appends its `tag` arg to the request strings.
pub(crate) struct Mark;

#[async_trait]
impl Processor for Mark {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::extern_input::<SharedReq>("REQ")]
    }

    async fn on_execute(
        &mut self,
        _cancel: &CancellationToken,
        params: &Params,
        io: &mut PortIo,
    ) -> Result<(), ProcessorError> {
        let req = request(io)?;
        req.lock().strs.push(params.get_str("tag").to_string());
        Ok(())
    }
}

/// Appends its `Value` input to the request ids, or -1 when none was produced.
pub(crate) struct Reader;

#[async_trait]
impl Processor for Reader {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::extern_input::<SharedReq>("REQ"),
            PortSpec::input::<i64>("Value"),
        ]
    }

    async fn on_execute(
        &mut self,
        _cancel: &CancellationToken,
        _params: &Params,
        io: &mut PortIo,
    ) -> Result<(), ProcessorError> {
        let req = request(io)?;
        let value = io.input::<i64>("Value")?.map(|v| *v).unwrap_or(-1);
        req.lock().id.push(value);
        Ok(())
    }
}

pub(crate) struct Emit;

#[async_trait]
impl Processor for Emit {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::output::<i64>("Value")]
    }

    async fn on_execute(
        &mut self,
        _cancel: &CancellationToken,
        params: &Params,
        io: &mut PortIo,
    ) -> Result<(), ProcessorError> {
        io.set_output("Value", params.get_i64("value"))?;
        Ok(())
    }
}

/// Sums every collected `Values` input into `Sum`.
pub(crate) struct Collect;

#[async_trait]
impl Processor for Collect {
    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::aggregate::<i64>("Values"),
            PortSpec::output::<i64>("Sum"),
        ]
    }

    async fn on_execute(
        &mut self,
        _cancel: &CancellationToken,
        _params: &Params,
        io: &mut PortIo,
    ) -> Result<(), ProcessorError> {
        let sum = io.aggregate::<i64>("Values")?.values().map(|v| **v).sum::<i64>();
        io.set_output("Sum", sum)?;
        Ok(())
    }
}

/// Counts its own executions; state survives across pooled runs.
#[derive(Default)]
pub(crate) struct Counter {
    runs: i64,
}

#[async_trait]
impl Processor for Counter {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::output::<i64>("Runs")]
    }

    async fn on_execute(
        &mut self,
        _cancel: &CancellationToken,
        _params: &Params,
        io: &mut PortIo,
    ) -> Result<(), ProcessorError> {
        self.runs += 1;
        io.set_output("Runs", self.runs)?;
        Ok(())
    }
}

/// Appends `<tag>:<GLOBAL.EXP>` to the request strings, or `none` when the
/// run parameters carry no `EXP`.
pub(crate) struct Global;

#[async_trait]
impl Processor for Global {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::extern_input::<SharedReq>("REQ")]
    }

    async fn on_execute(
        &mut self,
        _cancel: &CancellationToken,
        params: &Params,
        io: &mut PortIo,
    ) -> Result<(), ProcessorError> {
        let req = request(io)?;
        let global = params.get_params(GLOBAL_PARAMS_KEY);
        let seen = match global.get("EXP") {
            Some(exp) => format!("{}:{exp}", params.get_str("tag")),
            None => "none".to_string(),
        };
        req.lock().strs.push(seen);
        Ok(())
    }
}

/// Sleeps for its `millis` arg, then publishes `Out`.
pub(crate) struct Sleepy;

#[async_trait]
impl Processor for Sleepy {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::output::<i64>("Out")]
    }

    async fn on_execute(
        &mut self,
        _cancel: &CancellationToken,
        params: &Params,
        io: &mut PortIo,
    ) -> Result<(), ProcessorError> {
        let millis = params.get_i64("millis").max(0) as u64;
        tokio::time::sleep(Duration::from_millis(millis)).await;
        io.set_output("Out", 1_i64)?;
        Ok(())
    }
}

pub(crate) struct Explode;

#[async_trait]
impl Processor for Explode {
    async fn on_execute(
        &mut self,
        _cancel: &CancellationToken,
        _params: &Params,
        _io: &mut PortIo,
    ) -> Result<(), ProcessorError> {
        panic!("explode always panics");
    }
}

pub(crate) fn registry() -> ProcessorRegistry {
    let mut registry = ProcessorRegistry::new();
    registry
        .register("phase0", || Box::new(Phase0))
        .register("phase1", || Box::new(Phase1))
        .register("phase2", || Box::new(Phase2))
        .register("phase3", || Box::new(Phase3))
        .register("mark", || Box::new(Mark))
        .register("reader", || Box::new(Reader))
        .register("emit", || Box::new(Emit))
        .register("collect", || Box::new(Collect))
        .register("counter", || Box::<Counter>::default())
        .register("global", || Box::new(Global))
        .register("sleepy", || Box::new(Sleepy))
        .register("explode", || Box::new(Explode));
    registry
}
