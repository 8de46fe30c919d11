use std::collections::{BTreeMap, BTreeSet};

use crate::config::{FieldMeta, Params, SelectArgs, UnitConfig, VertexConfig};

/// Expected outcome of a dependency before a dependent may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    Ok,
    Err,
    Any,
}

impl ResultKind {
    /// Numeric code used in rendered graphs: OK=1, ERR=2, ANY=3.
    pub fn code(self) -> i64 {
        match self {
            ResultKind::Ok => 1,
            ResultKind::Err => 2,
            ResultKind::Any => 3,
        }
    }

    /// Whether a dependency that did (or did not) fail satisfies this expectation.
    pub fn accepts(self, failed: bool) -> bool {
        match self {
            ResultKind::Any => true,
            ResultKind::Ok => !failed,
            ResultKind::Err => failed,
        }
    }
}

/// A vertex port binding after defaults and metadata flags are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Unit {
    pub id: String,
    pub field: String,
    pub aggregate: Vec<String>,
    pub required: bool,
    pub optional: bool,
    pub move_value: bool,
    pub is_extern: bool,
    pub is_in_out: bool,
    pub is_map_input: bool,
}

impl Unit {
    /// Whether a missing producer is acceptable.
    pub fn may_be_absent(&self) -> bool {
        !self.required && (self.is_extern || self.optional)
    }
}

impl From<&UnitConfig> for Unit {
    fn from(cfg: &UnitConfig) -> Self {
        Self {
            id: cfg.id.clone(),
            field: cfg.field.clone(),
            aggregate: cfg.aggregate.clone(),
            required: cfg.required,
            optional: cfg.optional,
            move_value: cfg.move_value,
            is_extern: cfg.is_extern,
            is_in_out: false,
            is_map_input: !cfg.aggregate.is_empty(),
        }
    }
}

impl From<&FieldMeta> for Unit {
    fn from(meta: &FieldMeta) -> Self {
        Self {
            id: meta.name.clone(),
            field: meta.name.clone(),
            is_extern: meta.flags.is_extern(),
            is_in_out: meta.flags.is_in_out(),
            is_map_input: meta.flags.is_aggregate(),
            ..Default::default()
        }
    }
}

/// A built vertex: its declaration plus the resolved dependency edges.
#[derive(Debug, Clone)]
pub struct Vertex {
    pub id: String,
    pub processor: String,
    pub cond: String,
    pub expect: String,
    pub expect_config: String,
    pub select_args: Vec<SelectArgs>,
    pub params: Params,
    pub cluster: String,
    pub graph: String,
    pub start: bool,
    pub input: Vec<Unit>,
    pub output: Vec<Unit>,
    pub(crate) id_generated: bool,
    pub(crate) deps: BTreeMap<String, ResultKind>,
    pub(crate) successors: BTreeSet<String>,
}

impl Vertex {
    pub(crate) fn from_config(config: &VertexConfig) -> Self {
        Self {
            id: config.id.clone(),
            processor: config.processor.clone(),
            cond: config.cond.clone(),
            expect: config.expect.clone(),
            expect_config: config.expect_config.clone(),
            select_args: config.select_args.clone(),
            params: config.args.clone(),
            cluster: config.cluster.clone(),
            graph: config.graph.clone(),
            start: config.start,
            input: config.input.iter().map(Unit::from).collect(),
            output: config.output.iter().map(Unit::from).collect(),
            id_generated: false,
            deps: BTreeMap::new(),
            successors: BTreeSet::new(),
        }
    }

    /// Dependency ids and the outcome expected of each.
    pub fn deps(&self) -> &BTreeMap<String, ResultKind> {
        &self.deps
    }

    pub fn successors(&self) -> &BTreeSet<String> {
        &self.successors
    }

    pub fn is_subgraph(&self) -> bool {
        !self.graph.is_empty()
    }

    pub fn id_generated(&self) -> bool {
        self.id_generated
    }

    /// The label under which execution events are reported.
    pub fn event_name(&self) -> String {
        if self.is_subgraph() {
            format!("{}::{}", self.cluster, self.graph)
        } else {
            self.processor.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_kind_acceptance() {
        struct TestCase {
            kind: ResultKind,
            failed: bool,
            expected: bool,
        }

        let test_cases = vec![
            TestCase { kind: ResultKind::Ok, failed: false, expected: true },
            TestCase { kind: ResultKind::Ok, failed: true, expected: false },
            TestCase { kind: ResultKind::Err, failed: false, expected: false },
            TestCase { kind: ResultKind::Err, failed: true, expected: true },
            TestCase { kind: ResultKind::Any, failed: false, expected: true },
            TestCase { kind: ResultKind::Any, failed: true, expected: true },
        ];

        for case in test_cases {
            assert_eq!(
                case.kind.accepts(case.failed),
                case.expected,
                "{:?} with failed={}",
                case.kind,
                case.failed
            );
        }
    }

    #[test]
    fn test_unit_absence_rules() {
        let mut unit = Unit::from(&UnitConfig {
            field: "X".into(),
            optional: true,
            ..Default::default()
        });
        assert!(unit.may_be_absent());

        unit.required = true;
        assert!(!unit.may_be_absent(), "required overrides optional");

        let unit = Unit::from(&UnitConfig {
            field: "X".into(),
            ..Default::default()
        });
        assert!(!unit.may_be_absent());
    }
}
