//! NetBots control-flow-graph front end: validates a JSON graph into a
//! `Graph`, then lowers it to the same bytecode container format the
//! textual front end produces via a worklist layout algorithm.

use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;

use crate::bytecode::constant_pool::{ConstValue, ConstantPool};
use crate::bytecode::opcode::{Opcode, EXEC_BLOCK};
use crate::error::GraphError;

#[derive(Debug, Deserialize)]
struct RawBlock {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    config: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawConnection {
    from: String,
    to: String,
}

#[derive(Debug, Deserialize)]
struct RawGraph {
    blocks: Vec<RawBlock>,
    connections: Vec<RawConnection>,
}

/// One validated CFG block: its declared type, its config (serialized
/// verbatim into the output as a constant), and its successor/predecessor
/// sets recorded both as insertion-ordered vectors (for deterministic
/// layout) and as sets (for the invariant checks in §3).
#[derive(Debug, Clone)]
pub struct CfgBlock {
    pub id: String,
    pub kind: String,
    pub config: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug)]
pub struct Graph {
    pub blocks: Vec<CfgBlock>,
    index_of: HashMap<String, usize>,
    /// Successor ids in connection insertion order, per block index —
    /// this is what the layout worklist and the "by insertion order"
    /// determinism requirement both depend on.
    successors: Vec<Vec<String>>,
    predecessors: Vec<BTreeSet<String>>,
}

impl Graph {
    /// Parses and validates a NetBots graph from its JSON text form.
    /// Fails on any of the invariants in spec.md §3: unknown endpoints,
    /// duplicate edges, no/multiple entry blocks, malformed `if`/`loop`
    /// configs, or more than one successor on a non-branching block type.
    pub fn parse(json_text: &str) -> Result<Graph, crate::error::CompileError> {
        let raw: RawGraph = serde_json::from_str(json_text)?;

        let mut index_of = HashMap::with_capacity(raw.blocks.len());
        let mut blocks = Vec::with_capacity(raw.blocks.len());
        for (i, block) in raw.blocks.into_iter().enumerate() {
            if index_of.insert(block.id.clone(), i).is_some() {
                return Err(GraphError::MissingField {
                    block: block.id.clone(),
                    field: "id (duplicate)",
                }
                .into());
            }
            blocks.push(CfgBlock { id: block.id, kind: block.kind, config: block.config });
        }

        let mut successors = vec![Vec::new(); blocks.len()];
        let mut predecessors = vec![BTreeSet::new(); blocks.len()];
        let mut seen_edges: BTreeSet<(String, String)> = BTreeSet::new();

        for conn in &raw.connections {
            let from_idx = *index_of.get(&conn.from).ok_or_else(|| GraphError::UnknownEndpoint {
                edge_from: conn.from.clone(),
                edge_to: conn.to.clone(),
            })?;
            index_of.get(&conn.to).ok_or_else(|| GraphError::UnknownEndpoint {
                edge_from: conn.from.clone(),
                edge_to: conn.to.clone(),
            })?;

            let edge = (conn.from.clone(), conn.to.clone());
            if !seen_edges.insert(edge) {
                return Err(GraphError::DuplicateEdge { from: conn.from.clone(), to: conn.to.clone() }.into());
            }

            successors[from_idx].push(conn.to.clone());
            predecessors[index_of[&conn.to]].insert(conn.from.clone());
        }

        let graph = Graph { blocks, index_of, successors, predecessors };
        graph.validate()?;
        Ok(graph)
    }

    fn validate(&self) -> Result<(), GraphError> {
        let entries: Vec<&str> = self
            .blocks
            .iter()
            .enumerate()
            .filter(|(i, _)| self.predecessors[*i].is_empty())
            .map(|(_, b)| b.id.as_str())
            .collect();

        match entries.len() {
            0 => return Err(GraphError::NoEntry),
            1 => {}
            _ => return Err(GraphError::MultipleEntries(entries.into_iter().map(String::from).collect())),
        }

        for (i, block) in self.blocks.iter().enumerate() {
            match block.kind.as_str() {
                "if" => {
                    let true_target = block.config.get("trueTarget").and_then(|v| v.as_str());
                    let false_target = block.config.get("falseTarget").and_then(|v| v.as_str());
                    let targets = match (true_target, false_target) {
                        (Some(t), Some(f)) => [t, f],
                        _ => return Err(GraphError::MalformedIfConfig { block: block.id.clone() }),
                    };
                    if !self.targets_match_successors(i, &targets) {
                        return Err(GraphError::MalformedIfConfig { block: block.id.clone() });
                    }
                }
                "loop" => {
                    let body_start = block.config.get("bodyStart").and_then(|v| v.as_str());
                    let exit_target = block.config.get("exitTarget").and_then(|v| v.as_str());
                    let targets = match (body_start, exit_target) {
                        (Some(b), Some(e)) => [b, e],
                        _ => return Err(GraphError::MalformedLoopConfig { block: block.id.clone() }),
                    };
                    if !self.targets_match_successors(i, &targets) {
                        return Err(GraphError::MalformedLoopConfig { block: block.id.clone() });
                    }
                }
                _ => {
                    if self.successors[i].len() > 1 {
                        return Err(GraphError::TooManySuccessors { block: block.id.clone() });
                    }
                }
            }
        }
        Ok(())
    }

    /// A branching block's declared targets must both reference known
    /// blocks and must equal its actual outgoing edge set — a dangling or
    /// mismatched target is malformed config, not a valid edge, so this
    /// must reject it here rather than let the layout worklist pop an
    /// unplaced dangling id later.
    fn targets_match_successors(&self, block_idx: usize, targets: &[&str; 2]) -> bool {
        if !targets.iter().all(|t| self.index_of.contains_key(*t)) {
            return false;
        }
        let successors = &self.successors[block_idx];
        if successors.len() != 2 {
            return false;
        }
        let mut declared: Vec<&str> = targets.to_vec();
        let mut actual: Vec<&str> = successors.iter().map(String::as_str).collect();
        declared.sort_unstable();
        actual.sort_unstable();
        declared == actual
    }

    fn entry_index(&self) -> usize {
        self.blocks.iter().position(|b| self.predecessors_of(&b.id).is_empty()).expect("validated: exactly one entry")
    }

    fn predecessors_of(&self, id: &str) -> &BTreeSet<String> {
        &self.predecessors[self.index_of[id]]
    }

    fn block_index(&self, id: &str) -> usize {
        self.index_of[id]
    }

    fn successors_of(&self, id: &str) -> &[String] {
        &self.successors[self.index_of[id]]
    }

    fn true_target(&self, block: &CfgBlock) -> &str {
        block.config["trueTarget"].as_str().expect("validated")
    }

    fn false_target(&self, block: &CfgBlock) -> &str {
        block.config["falseTarget"].as_str().expect("validated")
    }

    fn body_start(&self, block: &CfgBlock) -> &str {
        block.config["bodyStart"].as_str().expect("validated")
    }

    fn exit_target(&self, block: &CfgBlock) -> &str {
        block.config["exitTarget"].as_str().expect("validated")
    }
}

/// A forward reference to a block that hadn't been placed yet when the
/// jump was emitted.
struct PendingPatch {
    pos: usize,
    target_id: String,
}

/// Lays out `graph` into a flat instruction stream using the seven-step
/// worklist algorithm from spec.md §4.5: each block becomes one
/// `EXEC_BLOCK const_idx` instruction (its `{type, config}` serialized as
/// an object constant), `if`/`loop` blocks get a `JZ` to their
/// false/exit target with the other branch pushed to the front of the
/// worklist for fall-through, and blocks with no successors emit `HALT`.
pub fn emit_graph(graph: &Graph) -> Result<(Vec<u8>, ConstantPool), GraphError> {
    let mut code = Vec::new();
    let mut constants = ConstantPool::new();
    let mut placed: HashMap<String, usize> = HashMap::new();
    let mut patches: Vec<PendingPatch> = Vec::new();

    let entry_id = graph.blocks[graph.entry_index()].id.clone();
    let mut pending: std::collections::VecDeque<String> = std::collections::VecDeque::new();
    pending.push_back(entry_id);

    while let Some(id) = pending.pop_front() {
        if placed.contains_key(&id) {
            continue;
        }
        let idx = graph.block_index(&id);
        let block = &graph.blocks[idx];
        placed.insert(id.clone(), code.len());

        let const_idx = constants.intern(block_to_const(block));
        code.push(EXEC_BLOCK);
        code.extend_from_slice(&const_idx.to_be_bytes());

        match block.kind.as_str() {
            "if" => {
                let false_target = graph.false_target(block).to_string();
                let true_target = graph.true_target(block).to_string();
                let jz_pos = emit_jump_placeholder(&mut code, Opcode::Jz);
                patches.push(PendingPatch { pos: jz_pos, target_id: false_target.clone() });
                pending.push_front(true_target);
                pending.push_back(false_target);
            }
            "loop" => {
                let exit_target = graph.exit_target(block).to_string();
                let body_start = graph.body_start(block).to_string();
                let jz_pos = emit_jump_placeholder(&mut code, Opcode::Jz);
                patches.push(PendingPatch { pos: jz_pos, target_id: exit_target.clone() });
                pending.push_front(body_start);
                pending.push_back(exit_target);
            }
            _ => {
                let successors = graph.successors_of(&id);
                match successors.first() {
                    None => code.push(Opcode::Halt as u8),
                    Some(next) => {
                        if placed.contains_key(next) {
                            let jmp_pos = emit_jump_placeholder(&mut code, Opcode::Jmp);
                            patches.push(PendingPatch { pos: jmp_pos, target_id: next.clone() });
                        } else {
                            pending.push_front(next.clone());
                        }
                    }
                }
            }
        }
    }

    for patch in patches {
        let target = *placed
            .get(&patch.target_id)
            .ok_or_else(|| GraphError::UnresolvedTarget { block: patch.target_id.clone() })?;
        patch_jump_to(&mut code, patch.pos, target)?;
    }

    Ok((code, constants))
}

fn emit_jump_placeholder(code: &mut Vec<u8>, op: Opcode) -> usize {
    code.push(op as u8);
    let pos = code.len();
    code.push(0);
    code.push(0);
    pos
}

fn patch_jump_to(code: &mut [u8], pos: usize, target: usize) -> Result<(), GraphError> {
    let disp = target as i64 - (pos as i64 + 2);
    if disp < i16::MIN as i64 || disp > i16::MAX as i64 {
        return Err(GraphError::DisplacementOutOfRange(disp));
    }
    let bytes = (disp as i16).to_be_bytes();
    code[pos] = bytes[0];
    code[pos + 1] = bytes[1];
    Ok(())
}

fn block_to_const(block: &CfgBlock) -> ConstValue {
    let mut entries = vec![("type".to_string(), ConstValue::Str(block.kind.clone()))];
    for (key, value) in &block.config {
        entries.push((key.clone(), json_to_const(value)));
    }
    ConstValue::Object(entries)
}

fn json_to_const(value: &serde_json::Value) -> ConstValue {
    match value {
        serde_json::Value::Null => ConstValue::Null,
        serde_json::Value::Bool(b) => ConstValue::Bool(*b),
        serde_json::Value::Number(n) => ConstValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => ConstValue::Str(s.clone()),
        serde_json::Value::Array(items) => {
            let entries = items.iter().enumerate().map(|(i, v)| (i.to_string(), json_to_const(v))).collect();
            ConstValue::Object(entries)
        }
        serde_json::Value::Object(map) => {
            let entries = map.iter().map(|(k, v)| (k.clone(), json_to_const(v))).collect();
            ConstValue::Object(entries)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_two_block_graph_emits_exec_block_then_halt() {
        let json = r#"{"blocks":[{"id":"A","type":"start"},{"id":"B","type":"end"}],"connections":[{"from":"A","to":"B"}]}"#;
        let graph = Graph::parse(json).unwrap();
        let (code, _) = emit_graph(&graph).unwrap();
        assert_eq!(code[0], EXEC_BLOCK);
        assert!(code.iter().any(|&b| b == Opcode::Halt as u8));
    }

    #[test]
    fn no_entry_block_is_an_error() {
        let json = r#"{"blocks":[{"id":"A","type":"start"},{"id":"B","type":"end"}],"connections":[{"from":"A","to":"B"},{"from":"B","to":"A"}]}"#;
        assert!(Graph::parse(json).is_err());
    }

    #[test]
    fn two_predecessorless_blocks_is_multiple_entries() {
        let json = r#"{"blocks":[{"id":"A","type":"start"},{"id":"B","type":"start"},{"id":"C","type":"end"}],"connections":[{"from":"A","to":"C"},{"from":"B","to":"C"}]}"#;
        match Graph::parse(json) {
            Err(crate::error::CompileError::Graph(GraphError::MultipleEntries(ids))) => {
                assert_eq!(ids.len(), 2);
            }
            other => panic!("expected MultipleEntries, got {other:?}"),
        }
    }

    #[test]
    fn if_block_missing_true_target_is_malformed() {
        let json = r#"{"blocks":[{"id":"A","type":"if","config":{"falseTarget":"B"}},{"id":"B","type":"end"}],"connections":[{"from":"A","to":"B"}]}"#;
        match Graph::parse(json) {
            Err(crate::error::CompileError::Graph(GraphError::MalformedIfConfig { .. })) => {}
            other => panic!("expected MalformedIfConfig, got {other:?}"),
        }
    }

    #[test]
    fn if_block_layout_places_true_target_by_fall_through() {
        let json = r#"{
            "blocks": [
                {"id":"A","type":"if","config":{"trueTarget":"T","falseTarget":"F"}},
                {"id":"T","type":"end"},
                {"id":"F","type":"end"}
            ],
            "connections": [{"from":"A","to":"T"},{"from":"A","to":"F"}]
        }"#;
        let graph = Graph::parse(json).unwrap();
        let (code, constants) = emit_graph(&graph).unwrap();
        assert_eq!(code[0], EXEC_BLOCK);
        assert_eq!(code[5], Opcode::Jz as u8);
        // T immediately follows A's JZ (fall-through); F's EXEC_BLOCK shows
        // up later in the stream, as the jump target.
        let jz_operand = i16::from_be_bytes([code[6], code[7]]);
        assert!(jz_operand > 0);
        assert_eq!(constants.len(), 3);
    }

    #[test]
    fn if_block_targets_not_matching_real_edges_is_malformed() {
        let json = r#"{"blocks":[{"id":"A","type":"if","config":{"trueTarget":"ghost1","falseTarget":"ghost2"}},{"id":"X","type":"end"},{"id":"Y","type":"end"}],"connections":[{"from":"A","to":"X"},{"from":"A","to":"Y"}]}"#;
        match Graph::parse(json) {
            Err(crate::error::CompileError::Graph(GraphError::MalformedIfConfig { .. })) => {}
            other => panic!("expected MalformedIfConfig, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_edge_is_an_error() {
        let json = r#"{"blocks":[{"id":"A","type":"start"},{"id":"B","type":"end"}],"connections":[{"from":"A","to":"B"},{"from":"A","to":"B"}]}"#;
        assert!(Graph::parse(json).is_err());
    }

    #[test]
    fn unknown_endpoint_is_an_error() {
        let json = r#"{"blocks":[{"id":"A","type":"start"}],"connections":[{"from":"A","to":"ghost"}]}"#;
        assert!(Graph::parse(json).is_err());
    }
}
