//! Black-box tests against the public `compile_program`/`compile_netbots`
//! entry points, covering the seed scenarios and universal invariants of
//! the bytecode container contract.

use jsbc::bytecode::opcode::EXEC_BLOCK;
use jsbc::bytecode::Opcode;
use jsbc::error::CompileError;
use jsbc::{compile_netbots, compile_program};

const HEADER_LEN: usize = 16;

fn header_fields(bytes: &[u8]) -> (&[u8], u32, u32, u32) {
    let magic = &bytes[0..4];
    let entry = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    let data_len = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
    let code_len = u32::from_le_bytes(bytes[12..16].try_into().unwrap());
    (magic, entry, data_len, code_len)
}

fn code_section(bytes: &[u8]) -> &[u8] {
    let (_, _, data_len, code_len) = header_fields(bytes);
    let code_start = HEADER_LEN + data_len as usize;
    &bytes[code_start..code_start + code_len as usize]
}

#[test]
fn header_sizes_match_the_encoded_sections_byte_exactly() {
    let bytes = compile_program("let x = 1 + 2;").unwrap();
    let (magic, entry, data_len, code_len) = header_fields(&bytes);
    assert_eq!(magic.len(), 4);
    assert_eq!(entry, 0);
    assert_eq!(bytes.len(), HEADER_LEN + data_len as usize + code_len as usize);
}

#[test]
fn halt_appears_exactly_once_at_the_end_of_top_level_code() {
    let bytes = compile_program("let x = 1; let y = 2; if (x) { y = y + 1; }").unwrap();
    let code = code_section(&bytes);
    assert_eq!(*code.last().unwrap(), Opcode::Halt as u8);
    let halt_count = code.iter().filter(|&&b| b == Opcode::Halt as u8).count();
    assert_eq!(halt_count, 1);
}

#[test]
fn seed_scenario_1_literal_let_emits_add_then_store_then_halt() {
    // `let x = 1 + 2;` — constants 1, 2, "x" at indices 0, 1, 2.
    let bytes = compile_program("let x = 1 + 2;").unwrap();
    let code = code_section(&bytes);

    assert_eq!(code[0], Opcode::PushConst as u8);
    assert_eq!(u32::from_be_bytes(code[1..5].try_into().unwrap()), 0);
    assert_eq!(code[5], Opcode::PushConst as u8);
    assert_eq!(u32::from_be_bytes(code[6..10].try_into().unwrap()), 1);
    assert_eq!(code[10], Opcode::Add as u8);
    assert_eq!(code[11], Opcode::StoreVar as u8);
    assert_eq!(u32::from_be_bytes(code[12..16].try_into().unwrap()), 2);
    assert_eq!(*code.last().unwrap(), Opcode::Halt as u8);
}

#[test]
fn seed_scenario_2_if_else_emits_one_jz_and_one_jmp() {
    let bytes = compile_program("if (a) { b(); } else { c(); }").unwrap();
    let code = code_section(&bytes);
    let jz_count = code.iter().filter(|&&b| b == Opcode::Jz as u8).count();
    let jmp_count = code.iter().filter(|&&b| b == Opcode::Jmp as u8).count();
    assert_eq!(jz_count, 1);
    assert_eq!(jmp_count, 1);
}

#[test]
fn seed_scenario_3_while_loop_back_jump_has_negative_displacement() {
    let bytes = compile_program("while (n > 0) { n = n - 1; }").unwrap();
    let code = code_section(&bytes);

    let jmp_pos = code
        .windows(1)
        .enumerate()
        .filter(|(_, w)| w[0] == Opcode::Jmp as u8)
        .map(|(i, _)| i)
        .last()
        .expect("loop back-jump present");
    let disp = i16::from_be_bytes([code[jmp_pos + 1], code[jmp_pos + 2]]);
    assert!(disp < 0, "back-jump displacement must be negative, got {disp}");
}

#[test]
fn seed_scenario_4_netbots_two_blocks_emits_exec_block_exec_block_halt() {
    let json = r#"{"blocks":[{"id":"A","type":"start"},{"id":"B","type":"end"}],"connections":[{"from":"A","to":"B"}]}"#;
    let bytes = compile_netbots(json).unwrap();
    let code = code_section(&bytes);

    assert_eq!(code[0], EXEC_BLOCK);
    let second_exec_at = 5;
    assert_eq!(code[second_exec_at], EXEC_BLOCK);
    assert_eq!(*code.last().unwrap(), Opcode::Halt as u8);
}

#[test]
fn seed_scenario_5_netbots_if_block_falls_through_to_true_target() {
    let json = r#"{
        "blocks": [
            {"id":"A","type":"if","config":{"trueTarget":"T","falseTarget":"F"}},
            {"id":"T","type":"end"},
            {"id":"F","type":"end"}
        ],
        "connections": [{"from":"A","to":"T"},{"from":"A","to":"F"}]
    }"#;
    let bytes = compile_netbots(json).unwrap();
    let code = code_section(&bytes);

    assert_eq!(code[0], EXEC_BLOCK);
    assert_eq!(code[5], Opcode::Jz as u8);
    // T's EXEC_BLOCK immediately follows the JZ's 2-byte operand (fall-through).
    assert_eq!(code[8], EXEC_BLOCK);
}

#[test]
fn seed_scenario_6_duplicate_declaration_message_matches_exactly() {
    let err = compile_program("let a; let a;").unwrap_err();
    match err {
        CompileError::Semantic(e) => assert_eq!(e.messages, vec!["Duplicate declaration: a"]),
        other => panic!("expected a semantic error, got {other:?}"),
    }
}

#[test]
fn constant_pool_dedups_equal_literal_occurrences() {
    let bytes = compile_program("let a = 5; let b = 5;").unwrap();
    let code = code_section(&bytes);
    let indices: Vec<u32> = code
        .windows(5)
        .filter(|w| w[0] == Opcode::PushConst as u8)
        .map(|w| u32::from_be_bytes([w[1], w[2], w[3], w[4]]))
        .collect();
    assert_eq!(indices[0], indices[1], "both literal 5s should share one constant index");
}

#[test]
fn compile_program_is_idempotent() {
    let source = "function add(a, b) { return a + b; } let r = add(1, 2);";
    assert_eq!(compile_program(source).unwrap(), compile_program(source).unwrap());
}

#[test]
fn compile_netbots_is_idempotent() {
    let json = r#"{"blocks":[{"id":"A","type":"start"},{"id":"B","type":"end"}],"connections":[{"from":"A","to":"B"}]}"#;
    assert_eq!(compile_netbots(json).unwrap(), compile_netbots(json).unwrap());
}

#[test]
fn template_concatenation_matches_the_round_trip_law() {
    let bytes = compile_program("let x = 1; let y = 2; `a${x}b${y}c`;").unwrap();
    let code = code_section(&bytes);

    let adds = code.iter().filter(|&&b| b == Opcode::Add as u8).count();
    assert_eq!(adds, 4, "template with two interpolations concatenates in left-to-right pairs");
}

#[test]
fn break_outside_a_loop_is_an_emission_error() {
    let err = compile_program("break;").unwrap_err();
    assert!(matches!(err, CompileError::Emit(_)));
}

#[test]
fn unterminated_string_is_a_lex_error() {
    let source = "let x = \"unterminated";
    let err = compile_program(source).unwrap_err();
    match err {
        CompileError::Lex(e) => assert_eq!(e.position, source.len()),
        other => panic!("expected a lex error, got {other:?}"),
    }
}

#[test]
fn netbots_two_predecessorless_blocks_is_multiple_start_blocks_error() {
    let json = r#"{"blocks":[{"id":"A","type":"start"},{"id":"B","type":"start"},{"id":"C","type":"end"}],"connections":[{"from":"A","to":"C"},{"from":"B","to":"C"}]}"#;
    let err = compile_netbots(json).unwrap_err();
    assert!(matches!(err, CompileError::Graph(_)));
}

#[test]
fn netbots_if_block_without_true_target_is_a_graph_error() {
    let json = r#"{"blocks":[{"id":"A","type":"if","config":{"falseTarget":"B"}},{"id":"B","type":"end"}],"connections":[{"from":"A","to":"B"}]}"#;
    let err = compile_netbots(json).unwrap_err();
    assert!(matches!(err, CompileError::Graph(_)));
}

#[test]
fn netbots_if_block_targets_dangling_from_real_edges_is_a_graph_error() {
    let json = r#"{"blocks":[{"id":"A","type":"if","config":{"trueTarget":"ghost1","falseTarget":"ghost2"}},{"id":"X","type":"end"},{"id":"Y","type":"end"}],"connections":[{"from":"A","to":"X"},{"from":"A","to":"Y"}]}"#;
    let err = compile_netbots(json).unwrap_err();
    assert!(matches!(err, CompileError::Graph(_)));
}
