//! Per-vertex execution state and the gating pipeline.
//!
//! A vertex runs once all of its dependencies have reported. Before invoking
//! its processor or subgraph it passes, in order:
//!
//! 1. dependency outcomes against their expected result kinds
//! 2. `expect_config`, possibly negated with a leading `!`
//! 3. `expect`, with `RET_CODE_<dep>` bound for every reported dependency
//! 4. `cond`, against the run parameters
//!
//! A gate that does not pass records an ERR outcome for the vertex, which
//! its successors see like any other failure.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;

use crate::config::consts::{GLOBAL_PARAMS_KEY, RET_CODE_PREFIX};
use crate::config::{Params, ProcessorRegistry};
use crate::engine::binding::PortBinder;
use crate::engine::events::Event;
use crate::engine::scope::RunScope;
use crate::errors::{BuildError, ExecutionError, ProcessorError};
use crate::graph::{ResultKind, Vertex};
use crate::observability::messages::vertex::{ExpressionFailed, ProcessorFailed, VertexSkipped};
use crate::observability::messages::StructuredLog;
use crate::traits::Processor;

/// What a vertex reported for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexOutcome {
    /// Set when a gate skipped the vertex.
    pub condition: Option<ProcessorError>,
    /// Set when the processor or subgraph failed.
    pub processor: Option<ProcessorError>,
}

impl VertexOutcome {
    pub fn failed(&self) -> bool {
        self.condition.is_some() || self.processor.is_some()
    }

    /// The processor's failure code, or 0.
    pub fn code(&self) -> i64 {
        self.processor.as_ref().map(|e| e.code).unwrap_or_default()
    }
}

struct BoundProcessor {
    processor: tokio::sync::Mutex<Box<dyn Processor>>,
    binder: PortBinder,
}

pub(crate) struct VertexContext {
    vertex: Arc<Vertex>,
    graph: String,
    bound: Option<BoundProcessor>,
    wait_num: AtomicUsize,
    dep_results: DashMap<String, VertexOutcome>,
    outcome: Mutex<VertexOutcome>,
}

impl VertexContext {
    pub(crate) fn new(
        graph: &str,
        vertex: Arc<Vertex>,
        registry: &ProcessorRegistry,
    ) -> Result<Self, BuildError> {
        let bound = if !vertex.is_subgraph() && !vertex.processor.is_empty() {
            let mut processor = registry.create(&vertex.processor).ok_or_else(|| {
                BuildError::UnregisteredProcessor {
                    processor: vertex.processor.clone(),
                }
            })?;
            let binder = PortBinder::prepare(
                &vertex.processor,
                &processor.ports(),
                &vertex.input,
                &vertex.output,
            )?;
            processor.on_init();
            Some(BoundProcessor {
                processor: tokio::sync::Mutex::new(processor),
                binder,
            })
        } else {
            None
        };

        Ok(Self {
            wait_num: AtomicUsize::new(vertex.deps().len()),
            graph: graph.to_string(),
            vertex,
            bound,
            dep_results: DashMap::new(),
            outcome: Mutex::new(VertexOutcome::default()),
        })
    }

    pub(crate) fn vertex(&self) -> &Arc<Vertex> {
        &self.vertex
    }

    pub(crate) fn binder(&self) -> Option<&PortBinder> {
        self.bound.as_ref().map(|b| &b.binder)
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.wait_num.load(Ordering::Acquire) == 0
    }

    pub(crate) fn outcome(&self) -> VertexOutcome {
        self.outcome.lock().clone()
    }

    /// Records a dependency's outcome and returns the remaining wait count.
    /// Only the first report from a given dependency counts down.
    pub(crate) fn set_dependency_result(&self, dep: &str, outcome: VertexOutcome) -> usize {
        let first = self.dep_results.insert(dep.to_string(), outcome).is_none();
        if first {
            self.wait_num.fetch_sub(1, Ordering::AcqRel).saturating_sub(1)
        } else {
            self.wait_num.load(Ordering::Acquire)
        }
    }

    pub(crate) fn reset(&self) {
        self.wait_num.store(self.vertex.deps().len(), Ordering::Release);
        self.dep_results.clear();
        *self.outcome.lock() = VertexOutcome::default();
    }

    /// Runs the vertex and emits one timing event.
    pub(crate) async fn execute(&self, scope: &RunScope) -> Result<(), ExecutionError> {
        let start = Instant::now();
        let result = self.run(scope).await;
        scope.manager.events().add_event(Event {
            processor: self.vertex.event_name(),
            duration: start.elapsed(),
        });
        result
    }

    async fn run(&self, scope: &RunScope) -> Result<(), ExecutionError> {
        if self.bound.is_none() && !self.vertex.is_subgraph() && self.vertex.cond.is_empty() {
            self.record_condition(ProcessorError::new(
                ResultKind::Err.code(),
                "vertex has neither processor nor subgraph",
            ));
            return Err(ExecutionError::InvalidVertex {
                graph: self.graph.clone(),
                vertex: self.vertex.id.clone(),
            });
        }

        if let Err(skip) = self.condition_check(scope) {
            VertexSkipped {
                graph: &self.graph,
                vertex: &self.vertex.id,
                reason: &skip.message,
            }
            .log();
            self.record_condition(skip);
            return Ok(());
        }

        if let Some(bound) = &self.bound {
            self.execute_processor(scope, bound).await;
        } else if self.vertex.is_subgraph() {
            self.execute_subgraph(scope).await;
        }
        Ok(())
    }

    fn record_condition(&self, err: ProcessorError) {
        self.outcome.lock().condition = Some(err);
    }

    fn record_processor(&self, err: ProcessorError) {
        self.outcome.lock().processor = Some(err);
    }

    fn condition_check(&self, scope: &RunScope) -> Result<(), ProcessorError> {
        self.check_condition_result()?;
        self.eval_expect_config(scope)?;
        self.eval_expect(scope)?;
        self.eval_cond(scope)
    }

    fn check_condition_result(&self) -> Result<(), ProcessorError> {
        for (dep, expected) in self.vertex.deps() {
            match self.dep_results.get(dep) {
                None if *expected == ResultKind::Err => {
                    return Err(skip(format!("dependency '{dep}' reported no outcome")));
                }
                None => {}
                Some(outcome) if !expected.accepts(outcome.failed()) => {
                    return Err(skip(format!(
                        "dependency '{dep}' outcome does not match expected {expected:?}"
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn eval_expect_config(&self, scope: &RunScope) -> Result<(), ProcessorError> {
        let setting = &self.vertex.expect_config;
        if setting.is_empty() {
            return Ok(());
        }
        let (name, negated) = match setting.strip_prefix('!') {
            Some(name) => (name, true),
            None => (setting.as_str(), false),
        };
        if scope.data.config_setting(name) == negated {
            return Err(skip(format!("expect_config '{setting}' does not hold")));
        }
        Ok(())
    }

    fn eval_expect(&self, scope: &RunScope) -> Result<(), ProcessorError> {
        let expect = &self.vertex.expect;
        if expect.is_empty() {
            return Ok(());
        }
        let mut bindings = scope.params.clone().unwrap_or_default();
        for dep in self.vertex.deps().keys() {
            if let Some(outcome) = self.dep_results.get(dep) {
                bindings.set_value(format!("{RET_CODE_PREFIX}{dep}"), outcome.code());
            }
        }
        if self.evaluates_false(scope, expect, &bindings) {
            return Err(skip(format!("expect '{expect}' is false")));
        }
        Ok(())
    }

    fn eval_cond(&self, scope: &RunScope) -> Result<(), ProcessorError> {
        let cond = &self.vertex.cond;
        if cond.is_empty() {
            return Ok(());
        }
        let Some(params) = &scope.params else {
            return Err(skip(format!("cond '{cond}' has no run parameters")));
        };
        if self.evaluates_false(scope, cond, params) {
            return Err(skip(format!("cond '{cond}' is false")));
        }
        Ok(())
    }

    /// Only a boolean `false` vetoes; evaluation errors are logged and ignored.
    fn evaluates_false(&self, scope: &RunScope, expression: &str, bindings: &Params) -> bool {
        match scope.manager.evaluator().evaluate(expression, bindings) {
            Ok(Value::Bool(value)) => !value,
            Ok(_) => false,
            Err(err) => {
                ExpressionFailed {
                    vertex: &self.vertex.id,
                    error: &err,
                }
                .log();
                false
            }
        }
    }

    async fn execute_processor(&self, scope: &RunScope, bound: &BoundProcessor) {
        let mut params = &self.vertex.params;
        for select in &self.vertex.select_args {
            if scope.data.config_setting(&select.match_setting) {
                params = &select.args;
                break;
            }
        }
        let mut io = bound.binder.inject(&scope.data, scope.manager.defaults());
        let params = match &scope.params {
            Some(global) => {
                let mut merged = params.clone();
                merged.set_params(GLOBAL_PARAMS_KEY, global.clone());
                merged
            }
            None => params.clone(),
        };

        let result = {
            let mut processor = bound.processor.lock().await;
            processor.on_execute(&scope.cancel, &params, &mut io).await
        };
        bound.binder.harvest(io, &scope.data);

        if let Err(err) = result {
            ProcessorFailed {
                graph: &self.graph,
                vertex: &self.vertex.id,
                error: &err,
            }
            .log();
            self.record_processor(err);
        }
    }

    async fn execute_subgraph(&self, scope: &RunScope) {
        let result = scope
            .manager
            .execute(
                scope.cancel.clone(),
                &self.vertex.cluster,
                &self.vertex.graph,
                Some(Arc::clone(&scope.data)),
                scope.params.clone(),
            )
            .await;
        if let Err(err) = result {
            let err = ProcessorError::new(ResultKind::Err.code(), err.to_string());
            ProcessorFailed {
                graph: &self.graph,
                vertex: &self.vertex.id,
                error: &err,
            }
            .log();
            self.record_processor(err);
        }
    }
}

fn skip(message: String) -> ProcessorError {
    ProcessorError::new(ResultKind::Err.code(), message)
}
