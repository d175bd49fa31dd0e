//! End-to-end compilation pipeline: source text in, assembled bytecode
//! container out. `compile_program` drives the textual front end
//! (lex → parse → check → emit → assemble), `compile_netbots` drives the
//! graph front end (parse JSON → validate → lay out → assemble).

use log::{debug, info};

use crate::bytecode::assembler::assemble;
use crate::bytecode::emitter;
use crate::error::CompileError;
use crate::graph::{emit_graph, Graph};
use crate::intern::Interner;
use crate::lexer;
use crate::parser;
use crate::semantic;

/// Magic bytes stamped on Program-front-end containers.
pub const PROGRAM_MAGIC: &[u8; 4] = b"PBO3";
/// Magic bytes stamped on NetBots-front-end containers.
pub const NETBOTS_MAGIC: &[u8; 4] = b"NBO2";

/// Compiles a JS-like source string through the textual front end into an
/// assembled bytecode container.
pub fn compile_program(source: &str) -> Result<Vec<u8>, CompileError> {
    let mut interner = Interner::new();

    debug!("lexing {} bytes of source", source.len());
    let tokens = lexer::lex(source, &mut interner).map_err(CompileError::Lex)?;

    debug!("parsing {} tokens", tokens.len());
    let program = parser::parse(tokens, &interner).map_err(CompileError::Parse)?;

    debug!("running semantic analysis");
    semantic::check(&program, &interner).map_err(CompileError::Semantic)?;

    debug!("emitting bytecode");
    let (code, constants) = emitter::emit(&program, &mut interner).map_err(CompileError::Emit)?;

    info!("assembling container: {} constant(s), {} code byte(s)", constants.len(), code.len());
    Ok(assemble(PROGRAM_MAGIC, &code, &constants))
}

/// Compiles a NetBots control-flow graph (JSON text) into an assembled
/// bytecode container.
pub fn compile_netbots(graph_json: &str) -> Result<Vec<u8>, CompileError> {
    debug!("parsing NetBots graph ({} bytes)", graph_json.len());
    let graph = Graph::parse(graph_json)?;

    debug!("laying out {} block(s)", graph.blocks.len());
    let (code, constants) = emit_graph(&graph)?;

    info!("assembling container: {} constant(s), {} code byte(s)", constants.len(), code.len());
    Ok(assemble(NETBOTS_MAGIC, &code, &constants))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_program_produces_program_magic() {
        let bytes = compile_program("let x = 1 + 2;").unwrap();
        assert_eq!(&bytes[0..4], PROGRAM_MAGIC);
    }

    #[test]
    fn compile_program_is_deterministic() {
        let a = compile_program("let x = 1 + 2; if (x) { x = x + 1; } else { x = 0; }").unwrap();
        let b = compile_program("let x = 1 + 2; if (x) { x = x + 1; } else { x = 0; }").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn compile_program_surfaces_semantic_errors() {
        let err = compile_program("x = 1;").unwrap_err();
        assert!(matches!(err, CompileError::Semantic(_)));
    }

    #[test]
    fn compile_netbots_produces_netbots_magic() {
        let json = r#"{"blocks":[{"id":"A","type":"start"},{"id":"B","type":"end"}],"connections":[{"from":"A","to":"B"}]}"#;
        let bytes = compile_netbots(json).unwrap();
        assert_eq!(&bytes[0..4], NETBOTS_MAGIC);
    }

    #[test]
    fn compile_netbots_is_deterministic() {
        let json = r#"{"blocks":[{"id":"A","type":"start"},{"id":"B","type":"end"}],"connections":[{"from":"A","to":"B"}]}"#;
        let a = compile_netbots(json).unwrap();
        let b = compile_netbots(json).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn compile_netbots_surfaces_graph_errors() {
        let json = r#"{"blocks":[{"id":"A","type":"start"}],"connections":[{"from":"A","to":"ghost"}]}"#;
        let err = compile_netbots(json).unwrap_err();
        assert!(matches!(err, CompileError::Graph(_)));
    }
}
