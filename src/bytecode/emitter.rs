//! Lowers a validated `Program` to a flat byte buffer plus its constant
//! pool. Single-pass with forward jump patches: every jump whose target
//! isn't known yet writes a placeholder displacement and remembers the
//! position, patched once the target offset is established.

use std::collections::HashMap;

use crate::ast::*;
use crate::bytecode::constant_pool::{ConstValue, ConstantPool};
use crate::bytecode::opcode::Opcode;
use crate::error::EmitError;
use crate::intern::{Interner, Symbol};

/// Identifiers calling into host/DOM APIs get `CALL_HOST` instead of a
/// plain `CALL`.
const HOST_ALLOWLIST: &[&str] =
    &["document", "window", "fetch", "setTimeout", "setInterval", "WebSocket", "console"];

/// Per-loop (and per-switch) bookkeeping: where `break`/`continue` jump
/// placeholders get resolved once the construct's extent is known.
struct LoopFrame {
    continue_target: usize,
    break_patches: Vec<usize>,
    continue_patches: Vec<usize>,
    /// `switch` participates in `break` resolution but never in
    /// `continue` — a `continue` inside a `switch` targets the nearest
    /// enclosing loop instead.
    is_switch: bool,
}

pub fn emit(program: &Program, interner: &mut Interner) -> Result<(Vec<u8>, ConstantPool), EmitError> {
    let mut emitter = Emitter {
        interner,
        code: Vec::new(),
        constants: ConstantPool::new(),
        loop_stack: Vec::new(),
        function_starts: HashMap::new(),
        temp_counter: 0,
    };
    for stmt in &program.body {
        emitter.emit_stmt(stmt)?;
    }
    emitter.push_op(Opcode::Halt);
    Ok((emitter.code, emitter.constants))
}

struct Emitter<'i> {
    interner: &'i mut Interner,
    code: Vec<u8>,
    constants: ConstantPool,
    loop_stack: Vec<LoopFrame>,
    /// Name -> code offset, recorded for every function/method body this
    /// emitter lays out. Forward references resolve at runtime load time,
    /// not here; this map is bookkeeping only.
    function_starts: HashMap<Symbol, usize>,
    temp_counter: u32,
}

impl<'i> Emitter<'i> {
    // ---- low-level byte/operand helpers ----

    fn push_op(&mut self, op: Opcode) {
        self.code.push(op as u8);
    }

    fn push_u8(&mut self, byte: u8) {
        self.code.push(byte);
    }

    fn push_u32(&mut self, value: u32) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    fn const_idx(&mut self, value: ConstValue) -> u32 {
        self.constants.intern(value)
    }

    fn emit_push_const(&mut self, value: ConstValue) {
        let idx = self.const_idx(value);
        self.push_op(Opcode::PushConst);
        self.push_u32(idx);
    }

    /// Interns `sym`'s spelling as a string constant, used for both
    /// variable-name and property-name operands (both share the one
    /// constant pool rather than a separate name table).
    fn name_idx(&mut self, sym: Symbol) -> u32 {
        let name = self.interner.resolve(sym).to_string();
        self.const_idx(ConstValue::Str(name))
    }

    fn str_idx(&mut self, s: &str) -> u32 {
        self.const_idx(ConstValue::Str(s.to_string()))
    }

    fn fresh_temp(&mut self) -> Symbol {
        let name = format!("$temp{}", self.temp_counter);
        self.temp_counter += 1;
        self.interner.intern(&name)
    }

    fn emit_load_var(&mut self, sym: Symbol) {
        let idx = self.name_idx(sym);
        self.push_op(Opcode::LoadVar);
        self.push_u32(idx);
    }

    fn emit_store_var(&mut self, sym: Symbol) {
        let idx = self.name_idx(sym);
        self.push_op(Opcode::StoreVar);
        self.push_u32(idx);
    }

    /// Emits `op` followed by a placeholder 16-bit displacement, returning
    /// the position of the placeholder for later patching.
    fn emit_jump_placeholder(&mut self, op: Opcode) -> usize {
        self.push_op(op);
        let pos = self.code.len();
        self.code.push(0);
        self.code.push(0);
        pos
    }

    fn patch_jump_to(&mut self, pos: usize, target: usize) -> Result<(), EmitError> {
        let disp = target as i64 - (pos as i64 + 2);
        if disp < i16::MIN as i64 || disp > i16::MAX as i64 {
            return Err(EmitError::DisplacementOutOfRange(disp));
        }
        let bytes = (disp as i16).to_be_bytes();
        self.code[pos] = bytes[0];
        self.code[pos + 1] = bytes[1];
        Ok(())
    }

    fn patch_jump(&mut self, pos: usize) -> Result<(), EmitError> {
        let target = self.code.len();
        self.patch_jump_to(pos, target)
    }

    fn emit_jmp_to(&mut self, target: usize) -> Result<(), EmitError> {
        let pos = self.emit_jump_placeholder(Opcode::Jmp);
        self.patch_jump_to(pos, target)
    }

    // ---- statements ----

    fn emit_stmts(&mut self, stmts: &[Stmt]) -> Result<(), EmitError> {
        for stmt in stmts {
            self.emit_stmt(stmt)?;
        }
        Ok(())
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), EmitError> {
        match stmt {
            Stmt::Block(stmts) => self.emit_stmts(stmts),
            Stmt::FunctionDecl(def) => {
                let start = self.emit_function_body(&def.params, &def.body, def.is_async, def.is_generator)?;
                if let Some(name) = def.name {
                    self.function_starts.insert(name, start);
                }
                Ok(())
            }
            Stmt::ClassDecl(def) => {
                self.emit_class_expr(def)?;
                match def.name {
                    Some(name) => self.emit_store_var(name),
                    None => self.push_op(Opcode::Pop),
                }
                Ok(())
            }
            Stmt::VarDecl(decl) => self.emit_var_decl(decl),
            Stmt::If { test, consequent, alternate } => {
                self.emit_expr(test)?;
                let jz = self.emit_jump_placeholder(Opcode::Jz);
                self.emit_stmt(consequent)?;
                match alternate {
                    Some(alt) => {
                        let jmp_end = self.emit_jump_placeholder(Opcode::Jmp);
                        self.patch_jump(jz)?;
                        self.emit_stmt(alt)?;
                        self.patch_jump(jmp_end)?;
                    }
                    None => self.patch_jump(jz)?,
                }
                Ok(())
            }
            Stmt::While { test, body } => self.emit_while(test, body),
            Stmt::For { init, test, update, body } => self.emit_for(init, test, update, body),
            Stmt::ForIn { left, right, body } => self.emit_for_of(left, right, body, true),
            Stmt::ForOf { left, right, body } => self.emit_for_of(left, right, body, false),
            Stmt::Return(expr) => {
                match expr {
                    Some(expr) => self.emit_expr(expr)?,
                    None => self.emit_push_const(ConstValue::Undefined),
                }
                self.push_op(Opcode::Return);
                Ok(())
            }
            Stmt::Break => {
                if self.loop_stack.is_empty() {
                    return Err(EmitError::BreakOutsideLoop);
                }
                let patch = self.emit_jump_placeholder(Opcode::Jmp);
                self.loop_stack.last_mut().unwrap().break_patches.push(patch);
                Ok(())
            }
            Stmt::Continue => {
                let idx = self
                    .loop_stack
                    .iter()
                    .rposition(|frame| !frame.is_switch)
                    .ok_or(EmitError::ContinueOutsideLoop)?;
                let patch = self.emit_jump_placeholder(Opcode::Jmp);
                self.loop_stack[idx].continue_patches.push(patch);
                Ok(())
            }
            Stmt::Throw(expr) => {
                self.emit_expr(expr)?;
                self.push_op(Opcode::Throw);
                Ok(())
            }
            Stmt::Try { block, handler, finalizer } => self.emit_try(block, handler, finalizer),
            Stmt::Switch { discriminant, cases } => self.emit_switch(discriminant, cases),
            Stmt::Import(decl) => self.emit_import(decl),
            Stmt::ExportNamed(decl) => {
                for specifier in &decl.specifiers {
                    self.emit_load_var(specifier.local);
                    let idx = self.name_idx(specifier.exported);
                    self.push_op(Opcode::Export);
                    self.push_u32(idx);
                }
                Ok(())
            }
            Stmt::ExportDecl(inner) => self.emit_stmt(inner),
            Stmt::ExportDefault(value) => {
                match value {
                    ExportDefaultValue::Decl(inner) => self.emit_export_default_decl(inner)?,
                    ExportDefaultValue::Expr(expr) => self.emit_expr(expr)?,
                }
                self.push_op(Opcode::ExportDefault);
                Ok(())
            }
            Stmt::ExprStmt(expr) => {
                self.emit_expr(expr)?;
                self.push_op(Opcode::Pop);
                Ok(())
            }
        }
    }

    /// `export default function f() {}` / `export default class C {}` must
    /// still produce the value `EXPORT_DEFAULT` consumes, unlike an
    /// ordinary top-level declaration of the same kind.
    fn emit_export_default_decl(&mut self, stmt: &Stmt) -> Result<(), EmitError> {
        match stmt {
            Stmt::FunctionDecl(def) => {
                let start = self.emit_function_body(&def.params, &def.body, def.is_async, def.is_generator)?;
                if let Some(name) = def.name {
                    self.function_starts.insert(name, start);
                }
                self.emit_push_const(ConstValue::Number(start as f64));
                Ok(())
            }
            Stmt::ClassDecl(def) => self.emit_class_expr(def),
            other => self.emit_stmt(other),
        }
    }

    fn emit_var_decl(&mut self, decl: &VarDecl) -> Result<(), EmitError> {
        for declarator in &decl.declarators {
            match &declarator.init {
                Some(init) => self.emit_expr(init)?,
                None => self.emit_push_const(ConstValue::Undefined),
            }
            self.emit_bind_target(&declarator.target)?;
        }
        Ok(())
    }

    /// Binds a value already on the stack top to `pattern`, consuming
    /// exactly that one value. A plain identifier stores directly; a
    /// destructuring pattern spills to a synthetic variable first.
    fn emit_bind_target(&mut self, pattern: &Pattern) -> Result<(), EmitError> {
        match pattern {
            Pattern::Ident(sym) => {
                self.emit_store_var(*sym);
                Ok(())
            }
            _ => {
                let temp = self.fresh_temp();
                self.emit_store_var(temp);
                self.emit_destructure_from_var(temp, pattern)
            }
        }
    }

    /// Reloads `source` for each sub-target, extracting by property name or
    /// numeric index and recursing. Holes in array patterns are skipped.
    fn emit_destructure_from_var(&mut self, source: Symbol, pattern: &Pattern) -> Result<(), EmitError> {
        match pattern {
            Pattern::Ident(sym) => {
                self.emit_load_var(source);
                self.emit_store_var(*sym);
                Ok(())
            }
            Pattern::Default { pattern: inner, default } => {
                self.emit_load_var(source);
                self.emit_push_const(ConstValue::Undefined);
                self.push_op(Opcode::StrictEq);
                let jz = self.emit_jump_placeholder(Opcode::Jz);
                self.emit_expr(default)?;
                self.emit_store_var(source);
                self.patch_jump(jz)?;
                self.emit_destructure_from_var(source, inner)
            }
            Pattern::Object { props } => {
                for prop in props {
                    let elem = self.fresh_temp();
                    self.emit_load_var(source);
                    match &prop.key {
                        PropertyKey::Ident(sym) => {
                            let idx = self.name_idx(*sym);
                            self.push_op(Opcode::GetProp);
                            self.push_u32(idx);
                        }
                        PropertyKey::Str(s) => {
                            let idx = self.str_idx(s);
                            self.push_op(Opcode::GetProp);
                            self.push_u32(idx);
                        }
                        PropertyKey::Computed(expr) => {
                            self.emit_expr(expr)?;
                            self.push_op(Opcode::GetPropComputed);
                        }
                    }
                    self.emit_store_var(elem);
                    self.emit_destructure_from_var(elem, &prop.value)?;
                }
                Ok(())
            }
            Pattern::Array { elements } => {
                for (i, element) in elements.iter().enumerate() {
                    if let Some(p) = element {
                        let elem = self.fresh_temp();
                        self.emit_load_var(source);
                        self.emit_push_const(ConstValue::Number(i as f64));
                        self.push_op(Opcode::GetPropComputed);
                        self.emit_store_var(elem);
                        self.emit_destructure_from_var(elem, p)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn emit_while(&mut self, test: &Expr, body: &Stmt) -> Result<(), EmitError> {
        let loop_start = self.code.len();
        self.loop_stack.push(LoopFrame {
            continue_target: loop_start,
            break_patches: Vec::new(),
            continue_patches: Vec::new(),
            is_switch: false,
        });
        self.emit_expr(test)?;
        let jz_end = self.emit_jump_placeholder(Opcode::Jz);
        self.emit_stmt(body)?;
        self.emit_jmp_to(loop_start)?;
        self.patch_jump(jz_end)?;
        self.close_loop_frame()
    }

    fn emit_for(
        &mut self,
        init: &ForInit,
        test: &Option<Expr>,
        update: &Option<Expr>,
        body: &Stmt,
    ) -> Result<(), EmitError> {
        match init {
            ForInit::VarDecl(decl) => self.emit_var_decl(decl)?,
            ForInit::Expr(expr) => {
                self.emit_expr(expr)?;
                self.push_op(Opcode::Pop);
            }
            ForInit::None => {}
        }

        let loop_start = self.code.len();
        match test {
            Some(test) => self.emit_expr(test)?,
            None => self.emit_push_const(ConstValue::Bool(true)),
        }
        let jz_end = self.emit_jump_placeholder(Opcode::Jz);
        self.emit_stmt(body)?;

        let continue_target = self.code.len();
        self.loop_stack.push(LoopFrame {
            continue_target,
            break_patches: Vec::new(),
            continue_patches: Vec::new(),
            is_switch: false,
        });
        if let Some(update) = update {
            self.emit_expr(update)?;
            self.push_op(Opcode::Pop);
        }
        self.emit_jmp_to(loop_start)?;
        self.patch_jump(jz_end)?;
        self.close_loop_frame()
    }

    /// `for-in`/`for-of` share a lowering: only the iterator-acquisition
    /// opcode differs in a full implementation, but this core models both
    /// through the same `GET_ITERATOR`-based protocol.
    fn emit_for_of(&mut self, left: &Pattern, right: &Expr, body: &Stmt, _is_for_in: bool) -> Result<(), EmitError> {
        self.emit_expr(right)?;
        self.push_op(Opcode::GetIterator);
        let iter_var = self.fresh_temp();
        self.emit_store_var(iter_var);

        let loop_start = self.code.len();
        self.loop_stack.push(LoopFrame {
            continue_target: loop_start,
            break_patches: Vec::new(),
            continue_patches: Vec::new(),
            is_switch: false,
        });

        self.emit_load_var(iter_var);
        let next_idx = self.str_idx("next");
        self.push_op(Opcode::GetProp);
        self.push_u32(next_idx);
        self.emit_load_var(iter_var);
        self.push_op(Opcode::Call);
        self.push_u32(1);

        self.push_op(Opcode::Dup);
        let done_idx = self.str_idx("done");
        self.push_op(Opcode::GetProp);
        self.push_u32(done_idx);
        let jnz_end = self.emit_jump_placeholder(Opcode::Jnz);

        let value_idx = self.str_idx("value");
        self.push_op(Opcode::GetProp);
        self.push_u32(value_idx);
        self.emit_bind_target(left)?;

        self.emit_stmt(body)?;
        self.emit_jmp_to(loop_start)?;
        self.patch_jump(jnz_end)?;
        self.close_loop_frame()
    }

    fn close_loop_frame(&mut self) -> Result<(), EmitError> {
        let frame = self.loop_stack.pop().expect("a loop frame was pushed by the caller");
        let end = self.code.len();
        for patch in frame.break_patches {
            self.patch_jump_to(patch, end)?;
        }
        for patch in frame.continue_patches {
            self.patch_jump_to(patch, frame.continue_target)?;
        }
        Ok(())
    }

    fn emit_try(
        &mut self,
        block: &[Stmt],
        handler: &Option<CatchClause>,
        finalizer: &Option<Vec<Stmt>>,
    ) -> Result<(), EmitError> {
        self.emit_stmts(block)?;
        let skip_catch = self.emit_jump_placeholder(Opcode::Jmp);
        if let Some(handler) = handler {
            self.push_op(Opcode::Catch);
            match &handler.param {
                Some(param) => self.emit_bind_target(param)?,
                None => self.push_op(Opcode::Pop),
            }
            self.emit_stmts(&handler.body)?;
            self.push_op(Opcode::EndCatch);
        }
        self.patch_jump(skip_catch)?;
        if let Some(finalizer) = finalizer {
            self.push_op(Opcode::Finally);
            self.emit_stmts(finalizer)?;
        }
        Ok(())
    }

    /// Resolves Open Question 4 by construction: every case's test is
    /// checked in a dispatch chain up front, then bodies are emitted once
    /// in source order with ordinary fall-through. The literal "test each
    /// case inline with its body" structure the spec describes re-tests a
    /// later case's condition after falling into an earlier one, which is
    /// exactly the bug the open question flags — this avoids it entirely
    /// rather than patching around it.
    fn emit_switch(&mut self, discriminant: &Expr, cases: &[SwitchCase]) -> Result<(), EmitError> {
        self.emit_expr(discriminant)?;
        let switch_var = self.fresh_temp();
        self.emit_store_var(switch_var);

        self.loop_stack.push(LoopFrame {
            continue_target: 0,
            break_patches: Vec::new(),
            continue_patches: Vec::new(),
            is_switch: true,
        });

        let mut dispatch_patches: Vec<Option<usize>> = Vec::with_capacity(cases.len());
        let mut default_index = None;
        for (i, case) in cases.iter().enumerate() {
            match &case.test {
                Some(test) => {
                    self.emit_load_var(switch_var);
                    self.emit_expr(test)?;
                    self.push_op(Opcode::Eq);
                    dispatch_patches.push(Some(self.emit_jump_placeholder(Opcode::Jnz)));
                }
                None => {
                    default_index = Some(i);
                    dispatch_patches.push(None);
                }
            }
        }
        let fallback_jmp = self.emit_jump_placeholder(Opcode::Jmp);

        let mut body_starts = vec![0usize; cases.len()];
        for (i, case) in cases.iter().enumerate() {
            body_starts[i] = self.code.len();
            self.emit_stmts(&case.body)?;
        }
        let end = self.code.len();

        for (i, patch) in dispatch_patches.into_iter().enumerate() {
            if let Some(patch) = patch {
                self.patch_jump_to(patch, body_starts[i])?;
            }
        }
        match default_index {
            Some(i) => self.patch_jump_to(fallback_jmp, body_starts[i])?,
            None => self.patch_jump_to(fallback_jmp, end)?,
        }

        let frame = self.loop_stack.pop().expect("switch frame pushed above");
        for patch in frame.break_patches {
            self.patch_jump_to(patch, end)?;
        }
        Ok(())
    }

    fn emit_import(&mut self, decl: &ImportDecl) -> Result<(), EmitError> {
        let source_idx = self.str_idx(&decl.source);
        if decl.specifiers.is_empty() {
            let name_idx = self.const_idx(ConstValue::Null);
            self.push_op(Opcode::Import);
            self.push_u32(source_idx);
            self.push_u32(name_idx);
            self.push_op(Opcode::Pop);
            return Ok(());
        }
        for specifier in &decl.specifiers {
            match specifier {
                ImportSpecifier::Default(sym) => {
                    self.push_op(Opcode::ImportDefault);
                    self.push_u32(source_idx);
                    self.emit_store_var(*sym);
                }
                ImportSpecifier::Named { imported, local } => {
                    let name_idx = self.name_idx(*imported);
                    self.push_op(Opcode::Import);
                    self.push_u32(source_idx);
                    self.push_u32(name_idx);
                    self.emit_store_var(*local);
                }
                ImportSpecifier::Namespace(sym) => {
                    let star_idx = self.str_idx("*");
                    self.push_op(Opcode::Import);
                    self.push_u32(source_idx);
                    self.push_u32(star_idx);
                    self.emit_store_var(*sym);
                }
            }
        }
        Ok(())
    }

    // ---- functions & classes ----

    /// Lays out a function/method body inline, preceded by an unconditional
    /// jump that skips it during ordinary linear execution. Returns the
    /// body's start offset (right after `ENTER_FUNC`'s prelude jump).
    fn emit_function_body(
        &mut self,
        params: &[Pattern],
        body: &[Stmt],
        is_async: bool,
        is_generator: bool,
    ) -> Result<usize, EmitError> {
        if is_async {
            self.push_op(Opcode::AsyncFunc);
        }
        if is_generator {
            self.push_op(Opcode::Generator);
        }
        let skip = self.emit_jump_placeholder(Opcode::Jmp);
        let start = self.code.len();
        self.push_op(Opcode::EnterFunc);
        for param in params {
            self.emit_bind_target(param)?;
        }
        self.emit_stmts(body)?;
        self.emit_push_const(ConstValue::Undefined);
        self.push_op(Opcode::Return);
        self.push_op(Opcode::ExitFunc);
        self.patch_jump(skip)?;
        Ok(start)
    }

    fn emit_class_expr(&mut self, def: &ClassDef) -> Result<(), EmitError> {
        let has_super = def.superclass.is_some();
        if let Some(superclass) = &def.superclass {
            self.emit_expr(superclass)?;
        }
        let name_const = match def.name {
            Some(sym) => ConstValue::Str(self.interner.resolve(sym).to_string()),
            None => ConstValue::Null,
        };
        let name_idx = self.const_idx(name_const);
        self.push_op(Opcode::NewClass);
        self.push_u8(if has_super { 1 } else { 0 });
        self.push_u32(name_idx);

        for method in &def.methods {
            let offset = self.emit_function_body(&method.params, &method.body, method.is_async, method.is_generator)?;
            self.push_op(Opcode::Dup);
            let key_idx = match &method.key {
                PropertyKey::Ident(sym) => self.name_idx(*sym),
                PropertyKey::Str(s) => self.str_idx(s),
                PropertyKey::Computed(_) => {
                    return Err(EmitError::UnsupportedNode("computed class member name".into()))
                }
            };
            let mut flags = 0u8;
            if method.is_static {
                flags |= 0b0001;
            }
            if method.is_async {
                flags |= 0b0010;
            }
            if method.is_generator {
                flags |= 0b0100;
            }
            if method.kind == MethodKind::Constructor {
                flags |= 0b1000;
            }
            let opcode = match method.kind {
                MethodKind::Get => Opcode::DefineGetter,
                MethodKind::Set => Opcode::DefineSetter,
                MethodKind::Method | MethodKind::Constructor => Opcode::DefineMethod,
            };
            self.push_op(opcode);
            self.push_u32(key_idx);
            self.push_u8(flags);
            self.push_u32(offset as u32);
        }
        Ok(())
    }

    // ---- expressions ----

    fn emit_expr(&mut self, expr: &Expr) -> Result<(), EmitError> {
        match expr {
            Expr::Identifier(sym) => {
                self.emit_load_var(*sym);
                Ok(())
            }
            Expr::Literal(lit) => {
                self.emit_push_const(literal_to_const(lit));
                Ok(())
            }
            Expr::This => {
                let this_sym = self.interner.intern("this");
                self.emit_load_var(this_sym);
                Ok(())
            }
            Expr::Super => {
                let super_sym = self.interner.intern("super");
                self.emit_load_var(super_sym);
                Ok(())
            }
            Expr::Template { quasis, exprs } => self.emit_template(quasis, exprs),
            Expr::Array { elements } => self.emit_array(elements),
            Expr::Object { props } => self.emit_object(props),
            Expr::Function(def) => {
                let start = self.emit_function_body(&def.params, &def.body, def.is_async, def.is_generator)?;
                if let Some(name) = def.name {
                    self.function_starts.insert(name, start);
                }
                self.emit_push_const(ConstValue::Number(start as f64));
                Ok(())
            }
            Expr::Class(def) => self.emit_class_expr(def),
            Expr::Unary { op, argument } => self.emit_unary(*op, argument),
            Expr::Update { op, argument, prefix } => self.emit_update(*op, argument, *prefix),
            Expr::Binary { op, left, right } => {
                self.emit_expr(left)?;
                self.emit_expr(right)?;
                self.push_op(binary_opcode(*op));
                Ok(())
            }
            Expr::Logical { op, left, right } => self.emit_logical(*op, left, right),
            Expr::Assign { op, target, value } => self.emit_assign(*op, target, value),
            Expr::Conditional { test, consequent, alternate } => {
                self.emit_expr(test)?;
                let jz = self.emit_jump_placeholder(Opcode::Jz);
                self.emit_expr(consequent)?;
                let jmp_end = self.emit_jump_placeholder(Opcode::Jmp);
                self.patch_jump(jz)?;
                self.emit_expr(alternate)?;
                self.patch_jump(jmp_end)?;
                Ok(())
            }
            Expr::Call { callee, args, .. } => self.emit_call(callee, args),
            Expr::New { callee, args } => {
                for arg in args.iter().rev() {
                    self.emit_expr(arg)?;
                }
                self.emit_expr(callee)?;
                self.push_op(Opcode::Call);
                self.push_u32(args.len() as u32);
                Ok(())
            }
            Expr::Member { object, property, computed, .. } => self.emit_member_read(object, property, *computed),
            Expr::Yield { argument, delegate } => {
                match argument {
                    Some(arg) => self.emit_expr(arg)?,
                    None => self.emit_push_const(ConstValue::Undefined),
                }
                self.push_op(if *delegate { Opcode::YieldDelegate } else { Opcode::Yield });
                Ok(())
            }
            Expr::ImportExpr { source } => {
                self.emit_expr(source)?;
                self.push_op(Opcode::ImportDynamic);
                Ok(())
            }
        }
    }

    fn emit_member_read(&mut self, object: &Expr, property: &Expr, computed: bool) -> Result<(), EmitError> {
        self.emit_expr(object)?;
        if computed {
            self.emit_expr(property)?;
            self.push_op(Opcode::GetPropComputed);
        } else {
            let idx = self.member_name_idx(property)?;
            self.push_op(Opcode::GetProp);
            self.push_u32(idx);
        }
        Ok(())
    }

    fn member_name_idx(&mut self, property: &Expr) -> Result<u32, EmitError> {
        match property {
            Expr::Identifier(sym) => Ok(self.name_idx(*sym)),
            _ => Err(EmitError::UnsupportedNode("non-computed member property must be an identifier".into())),
        }
    }

    fn emit_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<(), EmitError> {
        if matches!(callee, Expr::Super) {
            for arg in args.iter().rev() {
                self.emit_expr(arg)?;
            }
            self.push_op(Opcode::SuperCtor);
            self.push_u32(args.len() as u32);
            return Ok(());
        }
        if let Expr::Member { object, property, computed: false, .. } = callee {
            if matches!(object.as_ref(), Expr::Super) {
                for arg in args.iter().rev() {
                    self.emit_expr(arg)?;
                }
                let idx = self.member_name_idx(property)?;
                self.push_op(Opcode::InvokeSuper);
                self.push_u32(idx);
                self.push_u32(args.len() as u32);
                return Ok(());
            }
        }
        for arg in args.iter().rev() {
            self.emit_expr(arg)?;
        }
        if let Expr::Identifier(sym) = callee {
            let name = self.interner.resolve(*sym).to_string();
            if HOST_ALLOWLIST.contains(&name.as_str()) {
                let idx = self.str_idx(&name);
                self.push_op(Opcode::CallHost);
                self.push_u32(idx);
                self.push_u32(args.len() as u32);
                return Ok(());
            }
        }
        self.emit_expr(callee)?;
        self.push_op(Opcode::Call);
        self.push_u32(args.len() as u32);
        Ok(())
    }

    fn emit_template(&mut self, quasis: &[String], exprs: &[Expr]) -> Result<(), EmitError> {
        self.emit_push_const(ConstValue::Str(quasis[0].clone()));
        for (i, expr) in exprs.iter().enumerate() {
            self.emit_expr(expr)?;
            self.emit_push_const(ConstValue::Str(quasis[i + 1].clone()));
            self.push_op(Opcode::Add);
            self.push_op(Opcode::Add);
        }
        Ok(())
    }

    fn emit_array(&mut self, elements: &[Option<Expr>]) -> Result<(), EmitError> {
        for element in elements {
            match element {
                Some(expr) => self.emit_expr(expr)?,
                None => self.emit_push_const(ConstValue::Undefined),
            }
        }
        self.push_op(Opcode::NewArray);
        self.push_u32(elements.len() as u32);
        Ok(())
    }

    fn emit_object(&mut self, props: &[Property]) -> Result<(), EmitError> {
        self.push_op(Opcode::NewObject);
        for prop in props {
            self.push_op(Opcode::Dup);
            match prop {
                Property::Data { key, value } => {
                    self.emit_set_prop(key, |this| this.emit_expr(value))?;
                }
                Property::Shorthand { name } => {
                    let key = PropertyKey::Ident(*name);
                    self.emit_set_prop(&key, |this| {
                        this.emit_load_var(*name);
                        Ok(())
                    })?;
                }
                Property::Method { key, value } | Property::Getter { key, value } | Property::Setter { key, value } => {
                    self.emit_set_prop(key, |this| {
                        let start =
                            this.emit_function_body(&value.params, &value.body, value.is_async, value.is_generator)?;
                        this.emit_push_const(ConstValue::Number(start as f64));
                        Ok(())
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Emits `obj[key] = <value>` for an already-`DUP`'d object on the
    /// stack, where `value_fn` pushes the value to store.
    fn emit_set_prop(
        &mut self,
        key: &PropertyKey,
        value_fn: impl FnOnce(&mut Self) -> Result<(), EmitError>,
    ) -> Result<(), EmitError> {
        match key {
            PropertyKey::Computed(expr) => {
                self.emit_expr(expr)?;
                value_fn(self)?;
                self.push_op(Opcode::SetPropComputed);
            }
            PropertyKey::Ident(sym) => {
                let idx = self.name_idx(*sym);
                value_fn(self)?;
                self.push_op(Opcode::SetProp);
                self.push_u32(idx);
            }
            PropertyKey::Str(s) => {
                let idx = self.str_idx(s);
                value_fn(self)?;
                self.push_op(Opcode::SetProp);
                self.push_u32(idx);
            }
        }
        Ok(())
    }

    fn emit_unary(&mut self, op: UnaryOp, argument: &Expr) -> Result<(), EmitError> {
        match op {
            UnaryOp::Not => {
                self.emit_expr(argument)?;
                self.push_op(Opcode::Not);
            }
            UnaryOp::Neg => {
                self.emit_expr(argument)?;
                self.push_op(Opcode::Neg);
            }
            UnaryOp::Pos => {
                self.emit_expr(argument)?;
                self.push_op(Opcode::Pos);
            }
            UnaryOp::BitNot => {
                self.emit_expr(argument)?;
                self.push_op(Opcode::BitNot);
            }
            UnaryOp::Typeof => {
                self.emit_expr(argument)?;
                self.push_op(Opcode::Typeof);
            }
            UnaryOp::Await => {
                self.emit_expr(argument)?;
                self.push_op(Opcode::Await);
            }
            UnaryOp::Void => {
                self.emit_expr(argument)?;
                self.push_op(Opcode::Pop);
                self.emit_push_const(ConstValue::Undefined);
            }
            UnaryOp::Delete => match argument {
                Expr::Member { object, property, computed, .. } => {
                    self.emit_expr(object)?;
                    if *computed {
                        self.emit_expr(property)?;
                    } else if let Expr::Identifier(sym) = property.as_ref() {
                        let name = self.interner.resolve(*sym).to_string();
                        self.emit_push_const(ConstValue::Str(name));
                    } else {
                        return Err(EmitError::UnsupportedNode(
                            "non-computed member property must be an identifier".into(),
                        ));
                    }
                    self.push_op(Opcode::DeleteProp);
                }
                _ => return Err(EmitError::UnsupportedNode("'delete' requires a member expression".into())),
            },
        }
        Ok(())
    }

    fn emit_update(&mut self, op: UpdateOp, argument: &Expr, prefix: bool) -> Result<(), EmitError> {
        let delta = match op {
            UpdateOp::Inc => Opcode::Add,
            UpdateOp::Dec => Opcode::Sub,
        };
        match argument {
            Expr::Identifier(sym) => {
                self.emit_load_var(*sym);
                if !prefix {
                    self.push_op(Opcode::Dup);
                }
                self.emit_push_const(ConstValue::Number(1.0));
                self.push_op(delta);
                if prefix {
                    self.push_op(Opcode::Dup);
                }
                self.emit_store_var(*sym);
                Ok(())
            }
            Expr::Member { object, property, computed, .. } => {
                let temp_obj = self.fresh_temp();
                self.emit_expr(object)?;
                self.emit_store_var(temp_obj);
                let temp_key = if *computed {
                    let t = self.fresh_temp();
                    self.emit_expr(property)?;
                    self.emit_store_var(t);
                    Some(t)
                } else {
                    None
                };

                self.emit_member_load_from_temps(temp_obj, temp_key, property)?;
                if !prefix {
                    self.push_op(Opcode::Dup);
                }
                self.emit_push_const(ConstValue::Number(1.0));
                self.push_op(delta);
                if prefix {
                    self.push_op(Opcode::Dup);
                }

                let temp_val = self.fresh_temp();
                self.emit_store_var(temp_val);
                self.emit_load_var(temp_obj);
                if let Some(temp_key) = temp_key {
                    self.emit_load_var(temp_key);
                }
                self.emit_load_var(temp_val);
                self.emit_member_set_opcode(property, *computed)?;
                self.emit_load_var(temp_val);
                Ok(())
            }
            _ => Err(EmitError::InvalidAssignmentTarget("update target must be an identifier or member expression".into())),
        }
    }

    fn emit_member_load_from_temps(&mut self, temp_obj: Symbol, temp_key: Option<Symbol>, property: &Expr) -> Result<(), EmitError> {
        self.emit_load_var(temp_obj);
        match temp_key {
            Some(temp_key) => {
                self.emit_load_var(temp_key);
                self.push_op(Opcode::GetPropComputed);
            }
            None => {
                let idx = self.member_name_idx(property)?;
                self.push_op(Opcode::GetProp);
                self.push_u32(idx);
            }
        }
        Ok(())
    }

    /// Emits the store opcode only; assumes `obj, (key,) value` are already
    /// on the stack in that order.
    fn emit_member_set_opcode(&mut self, property: &Expr, computed: bool) -> Result<(), EmitError> {
        if computed {
            self.push_op(Opcode::SetPropComputed);
        } else {
            let idx = self.member_name_idx(property)?;
            self.push_op(Opcode::SetProp);
            self.push_u32(idx);
        }
        Ok(())
    }

    fn emit_logical(&mut self, op: LogicalOp, left: &Expr, right: &Expr) -> Result<(), EmitError> {
        match op {
            LogicalOp::And | LogicalOp::Or => {
                self.emit_expr(left)?;
                self.push_op(Opcode::Dup);
                let jump = self.emit_jump_placeholder(if op == LogicalOp::And { Opcode::Jz } else { Opcode::Jnz });
                self.push_op(Opcode::Pop);
                self.emit_expr(right)?;
                self.patch_jump(jump)?;
                Ok(())
            }
            LogicalOp::Coalesce => {
                self.emit_expr(left)?;
                self.emit_is_nullish()?;
                let jz_not_nullish = self.emit_jump_placeholder(Opcode::Jz);
                self.push_op(Opcode::Pop);
                self.emit_expr(right)?;
                let jmp_end = self.emit_jump_placeholder(Opcode::Jmp);
                self.patch_jump(jz_not_nullish)?;
                self.patch_jump(jmp_end)?;
                Ok(())
            }
        }
    }

    /// Leaves `[value, is_nullish]` on the stack given `[value]`, testing
    /// strict equality against both `null` and `undefined`. Resolves Open
    /// Question 1: rather than relying on `JZ`/`JNZ` (which test
    /// truthiness) or the ambiguous `COALESCE` opcode, nullishness is
    /// tested directly from opcodes already frozen by the interface.
    fn emit_is_nullish(&mut self) -> Result<(), EmitError> {
        self.push_op(Opcode::Dup);
        self.emit_push_const(ConstValue::Null);
        self.push_op(Opcode::StrictEq);
        let jnz_is_null = self.emit_jump_placeholder(Opcode::Jnz);
        self.push_op(Opcode::Dup);
        self.emit_push_const(ConstValue::Undefined);
        self.push_op(Opcode::StrictEq);
        let jmp_merge = self.emit_jump_placeholder(Opcode::Jmp);
        self.patch_jump(jnz_is_null)?;
        self.emit_push_const(ConstValue::Bool(true));
        self.patch_jump(jmp_merge)?;
        Ok(())
    }

    fn emit_assign(&mut self, op: AssignOp, target: &AssignTarget, value: &Expr) -> Result<(), EmitError> {
        match target {
            AssignTarget::Pattern(pattern) => {
                if op != AssignOp::Assign {
                    return Err(EmitError::InvalidAssignmentTarget(
                        "compound assignment requires an identifier or member target".into(),
                    ));
                }
                self.emit_expr(value)?;
                self.push_op(Opcode::Dup);
                self.emit_bind_target(pattern)
            }
            AssignTarget::Expr(expr) => match &**expr {
                Expr::Identifier(sym) => self.emit_assign_identifier(*sym, op, value),
                Expr::Member { object, property, computed, .. } => {
                    self.emit_assign_member(object, property, *computed, op, value)
                }
                _ => Err(EmitError::InvalidAssignmentTarget("assignment target must be an identifier or member expression".into())),
            },
        }
    }

    fn emit_assign_identifier(&mut self, sym: Symbol, op: AssignOp, value: &Expr) -> Result<(), EmitError> {
        if let Some(logical) = op.as_logical() {
            self.emit_load_var(sym);
            match logical {
                LogicalOp::And | LogicalOp::Or => {
                    self.push_op(Opcode::Dup);
                    let jump = self.emit_jump_placeholder(if logical == LogicalOp::And { Opcode::Jz } else { Opcode::Jnz });
                    self.push_op(Opcode::Pop);
                    self.emit_expr(value)?;
                    self.push_op(Opcode::Dup);
                    self.emit_store_var(sym);
                    self.patch_jump(jump)?;
                }
                LogicalOp::Coalesce => {
                    self.emit_is_nullish()?;
                    let jz_not_nullish = self.emit_jump_placeholder(Opcode::Jz);
                    self.push_op(Opcode::Pop);
                    self.emit_expr(value)?;
                    self.push_op(Opcode::Dup);
                    self.emit_store_var(sym);
                    let jmp_end = self.emit_jump_placeholder(Opcode::Jmp);
                    self.patch_jump(jz_not_nullish)?;
                    self.patch_jump(jmp_end)?;
                }
            }
            return Ok(());
        }

        if let Some(binary) = op.as_binary() {
            self.emit_load_var(sym);
            self.emit_expr(value)?;
            self.push_op(binary_opcode(binary));
        } else {
            self.emit_expr(value)?;
        }
        self.push_op(Opcode::Dup);
        self.emit_store_var(sym);
        Ok(())
    }

    fn emit_assign_member(
        &mut self,
        object: &Expr,
        property: &Expr,
        computed: bool,
        op: AssignOp,
        value: &Expr,
    ) -> Result<(), EmitError> {
        let temp_obj = self.fresh_temp();
        self.emit_expr(object)?;
        self.emit_store_var(temp_obj);
        let temp_key = if computed {
            let t = self.fresh_temp();
            self.emit_expr(property)?;
            self.emit_store_var(t);
            Some(t)
        } else {
            None
        };

        if let Some(logical) = op.as_logical() {
            self.emit_member_load_from_temps(temp_obj, temp_key, property)?;
            match logical {
                LogicalOp::And | LogicalOp::Or => {
                    self.push_op(Opcode::Dup);
                    let jump = self.emit_jump_placeholder(if logical == LogicalOp::And { Opcode::Jz } else { Opcode::Jnz });
                    self.push_op(Opcode::Pop);
                    self.emit_assign_member_store(temp_obj, temp_key, property, computed, value)?;
                    self.patch_jump(jump)?;
                }
                LogicalOp::Coalesce => {
                    self.emit_is_nullish()?;
                    let jz_not_nullish = self.emit_jump_placeholder(Opcode::Jz);
                    self.push_op(Opcode::Pop);
                    self.emit_assign_member_store(temp_obj, temp_key, property, computed, value)?;
                    let jmp_end = self.emit_jump_placeholder(Opcode::Jmp);
                    self.patch_jump(jz_not_nullish)?;
                    self.patch_jump(jmp_end)?;
                }
            }
            return Ok(());
        }

        if let Some(binary) = op.as_binary() {
            self.emit_member_load_from_temps(temp_obj, temp_key, property)?;
            self.emit_expr(value)?;
            self.push_op(binary_opcode(binary));
            let temp_val = self.fresh_temp();
            self.emit_store_var(temp_val);
            self.emit_load_var(temp_obj);
            if let Some(temp_key) = temp_key {
                self.emit_load_var(temp_key);
            }
            self.emit_load_var(temp_val);
            self.emit_member_set_opcode(property, computed)?;
            self.emit_load_var(temp_val);
        } else {
            self.emit_expr(value)?;
            let temp_val = self.fresh_temp();
            self.emit_store_var(temp_val);
            self.emit_load_var(temp_obj);
            if let Some(temp_key) = temp_key {
                self.emit_load_var(temp_key);
            }
            self.emit_load_var(temp_val);
            self.emit_member_set_opcode(property, computed)?;
            self.emit_load_var(temp_val);
        }
        Ok(())
    }

    /// Stores `<value>` into the spilled member target, leaving the stored
    /// value on the stack. Used only from the logical-compound-assignment
    /// paths, where the write only happens along the taken branch.
    fn emit_assign_member_store(
        &mut self,
        temp_obj: Symbol,
        temp_key: Option<Symbol>,
        property: &Expr,
        computed: bool,
        value: &Expr,
    ) -> Result<(), EmitError> {
        self.emit_expr(value)?;
        let temp_val = self.fresh_temp();
        self.emit_store_var(temp_val);
        self.emit_load_var(temp_obj);
        if let Some(temp_key) = temp_key {
            self.emit_load_var(temp_key);
        }
        self.emit_load_var(temp_val);
        self.emit_member_set_opcode(property, computed)?;
        self.emit_load_var(temp_val);
        Ok(())
    }
}

fn literal_to_const(lit: &Literal) -> ConstValue {
    match lit {
        Literal::Number(n) => ConstValue::Number(*n),
        Literal::BigInt(n) => ConstValue::BigInt(*n),
        Literal::Str(s) => ConstValue::Str(s.clone()),
        Literal::Bool(b) => ConstValue::Bool(*b),
        Literal::Null => ConstValue::Null,
        Literal::Undefined => ConstValue::Undefined,
    }
}

fn binary_opcode(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Mod => Opcode::Mod,
        BinaryOp::Pow => Opcode::Pow,
        BinaryOp::Eq => Opcode::Eq,
        BinaryOp::StrictEq => Opcode::StrictEq,
        BinaryOp::NotEq => Opcode::Neq,
        BinaryOp::StrictNotEq => Opcode::StrictNeq,
        BinaryOp::Lt => Opcode::Lt,
        BinaryOp::Gt => Opcode::Gt,
        BinaryOp::LtEq => Opcode::Lte,
        BinaryOp::GtEq => Opcode::Gte,
        BinaryOp::In => Opcode::InOp,
        BinaryOp::Instanceof => Opcode::Instanceof,
        BinaryOp::BitOr => Opcode::BitOr,
        BinaryOp::BitXor => Opcode::BitXor,
        BinaryOp::BitAnd => Opcode::BitAnd,
        BinaryOp::Shl => Opcode::Shl,
        BinaryOp::Shr => Opcode::Shr,
        BinaryOp::UShr => Opcode::UShr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::opcode::Opcode;
    use crate::{intern::Interner, lexer, parser};

    fn emit_source(source: &str) -> (Vec<u8>, ConstantPool) {
        let mut interner = Interner::new();
        let tokens = lexer::lex(source, &mut interner).expect("lex");
        let program = parser::parse(tokens, &interner).expect("parse");
        emit(&program, &mut interner).expect("emit")
    }

    #[test]
    fn literal_statement_is_push_pop_halt() {
        let (code, constants) = emit_source("42;");
        assert_eq!(code, vec![Opcode::PushConst as u8, 0, 0, 0, 0, Opcode::Pop as u8, Opcode::Halt as u8]);
        assert_eq!(constants.values(), &[ConstValue::Number(42.0)]);
    }

    #[test]
    fn halt_appears_exactly_once_at_the_end() {
        let (code, _) = emit_source("let a = 1; if (a) { a = 2; } else { a = 3; }");
        assert_eq!(code.iter().filter(|&&b| b == Opcode::Halt as u8).count(), 1);
        assert_eq!(*code.last().unwrap(), Opcode::Halt as u8);
    }

    #[test]
    fn while_loop_back_jump_is_negative() {
        let (code, _) = emit_source("while (n) { n = 0; }");
        let jmp_pos = code.iter().rposition(|&b| b == Opcode::Jmp as u8).unwrap();
        let operand_start = jmp_pos + 1;
        let disp = i16::from_be_bytes([code[operand_start], code[operand_start + 1]]);
        assert!(disp < 0);
    }

    #[test]
    fn template_concatenation_matches_the_round_trip_law() {
        let (code, _) = emit_source("`a${x}b${y}c`;");
        use Opcode::*;
        let expected = [PushConst, LoadVar, PushConst, Add, Add, LoadVar, PushConst, Add, Add, Pop, Halt];
        let ops: Vec<Opcode> = code
            .iter()
            .scan(0usize, |i, _| {
                if *i >= code.len() {
                    return None;
                }
                let op = Opcode::try_from_u8(code[*i])?;
                *i += 1 + operand_len(op);
                Some(op)
            })
            .collect();
        assert_eq!(ops, expected);
    }

    fn operand_len(op: Opcode) -> usize {
        use Opcode::*;
        match op {
            PushConst | LoadVar | StoreVar | LoadGlobal | StoreGlobal | GetProp | SetProp | Call | Export
            | ImportDefault | NewArray => 4,
            Jmp | Jz | Jnz => 2,
            _ => 0,
        }
    }

    #[test]
    fn break_outside_loop_is_an_emit_error() {
        let mut interner = Interner::new();
        let tokens = lexer::lex("break;", &mut interner).unwrap();
        let program = parser::parse(tokens, &interner).unwrap();
        assert!(matches!(emit(&program, &mut interner), Err(EmitError::BreakOutsideLoop)));
    }

    #[test]
    fn switch_break_skips_remaining_cases() {
        let (code, _) = emit_source("switch (x) { case 1: y = 1; break; case 2: y = 2; break; }");
        assert!(code.iter().any(|&b| b == Opcode::Jnz as u8));
    }

    #[test]
    fn destructuring_declaration_uses_a_synthetic_temp() {
        let (_, constants) = emit_source("let { a, b } = obj;");
        assert!(constants.values().iter().any(|v| matches!(v, ConstValue::Str(s) if s == "$temp0")));
    }

    #[test]
    fn super_constructor_call_emits_super_ctor() {
        let (code, _) = emit_source("class C extends B { constructor() { super(1); } }");
        assert!(code.iter().any(|&b| b == Opcode::SuperCtor as u8));
        assert!(!code.iter().any(|&b| b == Opcode::Call as u8));
    }

    #[test]
    fn super_method_call_emits_invoke_super() {
        let (code, _) = emit_source("class C extends B { m() { super.f(1); } }");
        assert!(code.iter().any(|&b| b == Opcode::InvokeSuper as u8));
    }
}
