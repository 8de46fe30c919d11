//! Graphviz rendering of built clusters.
//!
//! Each graph becomes a `subgraph cluster_<name>` bracketed by START and STOP
//! sentinels. Config settings and `expect` expressions are drawn as diamonds
//! feeding the vertices they gate.

use std::fmt::Write;

use crate::graph::cluster::Cluster;
use crate::graph::graph::Graph;
use crate::graph::vertex::{ResultKind, Vertex};

pub(crate) fn dump_cluster(cluster: &Cluster) -> String {
    let mut out = String::new();
    out.push_str("digraph G {\n");
    out.push_str("    rankdir=LR;\n");
    for graph in cluster.graphs().iter().rev() {
        dump_graph(cluster, graph, &mut out);
    }
    out.push_str("}\n");
    out
}

fn dump_graph(cluster: &Cluster, graph: &Graph, out: &mut String) {
    let name = &graph.name;
    let _ = writeln!(out, "  subgraph cluster_{name}{{");
    out.push_str("    style = rounded;\n");
    let _ = writeln!(out, "    label = \"{name}\";");
    let _ = writeln!(
        out,
        "    {name}__START__[color=black fillcolor=deepskyblue style=filled shape=Msquare label=\"START\"];"
    );
    let _ = writeln!(
        out,
        "    {name}__STOP__[color=black fillcolor=deepskyblue style=filled shape=Msquare label=\"STOP\"];"
    );

    for vertex in graph.vertices() {
        let shape = if !vertex.cond.is_empty() {
            "shape=diamond color=black fillcolor=aquamarine style=filled"
        } else if vertex.is_subgraph() {
            "shape=box3d, color=blue fillcolor=aquamarine style=filled"
        } else {
            "color=black fillcolor=linen style=filled"
        };
        let _ = writeln!(
            out,
            "    {} [label=\"{}\" {shape}];",
            dot_id(name, &vertex.id),
            dot_label(vertex)
        );
    }

    for setting in &cluster.config_settings {
        let _ = writeln!(
            out,
            "    {name}_{} [label=\"{}\" shape=diamond color=black fillcolor=aquamarine style=filled];",
            setting.name, setting.name
        );
    }

    for vertex in graph.vertices() {
        dump_edges(graph, vertex, out);
    }
    out.push_str("};\n");
}

fn dump_edges(graph: &Graph, vertex: &Vertex, out: &mut String) {
    let name = &graph.name;
    let id = dot_id(name, &vertex.id);

    if !vertex.expect_config.is_empty() {
        let setting = format!("{name}_{}", vertex.expect_config.replace('!', ""));
        let _ = writeln!(out, "    {setting} -> {id}{};", gate_style(&vertex.expect_config));
        let _ = writeln!(out, "    {name}__START__ -> {setting};");
    }
    if !vertex.expect.is_empty() {
        let expect = format!("{name}_{}", sanitize(&vertex.expect));
        let _ = writeln!(
            out,
            "    {expect} [label=\"{}\" shape=diamond color=black fillcolor=aquamarine style=filled];",
            escape(&vertex.expect)
        );
        let _ = writeln!(out, "    {expect} -> {id}{};", gate_style(&vertex.expect));
        let _ = writeln!(out, "    {name}__START__ -> {expect};");
    }
    if vertex.successors().is_empty() {
        let _ = writeln!(out, "    {id} -> {name}__STOP__;");
    }
    if vertex.deps().is_empty() {
        let _ = writeln!(out, "    {name}__START__ -> {id};");
    }
    for (dep, kind) in vertex.deps() {
        let style = match kind {
            ResultKind::Ok => " [style=dashed label=\"ok\"]",
            ResultKind::Err => " [style=dashed color=red label=\"err\"]",
            ResultKind::Any => " [style=bold label=\"all\"]",
        };
        let _ = writeln!(out, "    {} -> {id}{style};", dot_id(name, dep));
    }
}

fn gate_style(expr: &str) -> &'static str {
    if expr.starts_with('!') {
        " [style=dashed color=red label=\"err\"]"
    } else {
        " [style=bold label=\"ok\"]"
    }
}

fn dot_id(graph: &str, vertex: &str) -> String {
    format!("{graph}_{vertex}")
}

fn dot_label(vertex: &Vertex) -> String {
    if !vertex.cond.is_empty() {
        return escape(&vertex.cond);
    }
    if !vertex.processor.is_empty() {
        return vertex.id.clone();
    }
    if vertex.is_subgraph() {
        return format!("{}::{}", vertex.cluster, vertex.graph);
    }
    "unknown".to_string()
}

fn escape(text: &str) -> String {
    text.replace('"', "\\\"")
}

/// Strips characters that cannot appear in a bare DOT node id.
fn sanitize(expr: &str) -> String {
    expr.chars()
        .filter(|c| !matches!(c, '"' | '\'' | '[' | ']' | ',' | '!' | '=' | '>' | '<' | ' '))
        .collect()
}
