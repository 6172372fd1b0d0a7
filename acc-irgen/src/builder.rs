use std::collections::HashMap;
use std::rc::Rc;

use acc_ast::{
    BinaryOp, Decl, DeclBody, Expr, ExprKind, PostfixOp, Primary, PrimaryKind, Stmt, StmtKind,
    TranslationUnit, UnaryOp,
};
use acc_ir::{
    BasicBlockId, Function, Instruction, Object, ObjectId, ObjectStorage, Opcode, Program,
    RegisterId, RegisterKind,
};
use acc_symbol::{SymbolId, SymbolTable};
use acc_types::{BasicKind, CType, Shape, Target};

use crate::block_and::{unpack, BlockAnd, BlockAndExtend};

/// Lowers an analyzed translation unit into the three-address IR.
///
/// One `IrGen` lowers a whole program: it owns the `Program` under
/// construction and, while inside a function, that function's
/// in-progress `Function` (moved out of `current_function` and pushed
/// onto the program once its body is fully lowered). `locals` and
/// `argument_slots` are per-function state, cleared at the start of
/// each function; `globals` and `string_count` persist across the
/// whole program.
pub struct IrGen<'a> {
    program: Program,
    current_function: Option<Function>,
    table: &'a SymbolTable,
    target: Target,
    globals: HashMap<SymbolId, ObjectId>,
    locals: HashMap<SymbolId, ObjectId>,
    argument_slots: Vec<RegisterId>,
    return_register: Option<RegisterId>,
    string_count: u32,
    string_offset: u32,
    /// Global declarations with initializers have nowhere to run their
    /// `STORE` at top level, so their assignments are collected into
    /// this synthetic function (emitted into the program under
    /// [`GLOBAL_INIT_NAME`] only if at least one global uses it).
    global_init: Option<Function>,
    global_init_cursor: Option<BasicBlockId>,
}

/// Name of the synthetic function holding lowered global initializers.
/// Not a legal identifier in the source language, so it can't collide
/// with a user-defined function.
const GLOBAL_INIT_NAME: &str = "$globals_init";

impl<'a> IrGen<'a> {
    pub fn new(table: &'a SymbolTable, target: Target) -> Self {
        Self {
            program: Program::new(),
            current_function: None,
            table,
            target,
            globals: HashMap::new(),
            locals: HashMap::new(),
            argument_slots: Vec::new(),
            return_register: None,
            string_count: 0,
            string_offset: 0,
            global_init: None,
            global_init_cursor: None,
        }
    }

    pub fn generate(mut self, unit: &TranslationUnit) -> Program {
        for decl in &unit.decls {
            self.walk_decl(decl);
        }
        if let Some(mut init) = self.global_init.take() {
            let entry = init.entry();
            if !init.blocks[entry].is_terminated() {
                init.blocks[entry].push(Instruction::new(Opcode::Return));
            }
            self.program.add_function(init);
        }
        self.program
    }

    // --- Declarations -------------------------------------------------

    fn walk_decl(&mut self, decl: &Decl) {
        let Some(symbol) = decl.resolved_symbol else { return };
        match &decl.body {
            DeclBody::Body(stmts) => self.walk_decl_function(decl, stmts),
            _ if decl.is_function() => {}
            DeclBody::Initializer(init) if self.current_function.is_none() => {
                self.lower_global_decl(decl, symbol, init);
            }
            _ => {
                self.register_object(decl, symbol);
            }
        }
    }

    fn walk_decl_function(&mut self, decl: &Decl, stmts: &[Stmt]) {
        let name = decl.identifier.clone().unwrap_or_default();
        let mut function = Function::new(name);

        let (return_ty, param_count) = match &decl.ty.shape {
            Shape::Function(ret, params) => (ret.clone(), params.len()),
            _ => (Rc::new(CType::basic(BasicKind::SignedInt)), 0),
        };
        for _ in 0..param_count {
            function.new_register(RegisterKind::Argument);
        }
        let return_register = (!matches!(return_ty.shape, Shape::Basic(BasicKind::Void)))
            .then(|| function.new_register(RegisterKind::Return));

        self.current_function = Some(function);
        self.locals.clear();
        self.argument_slots.clear();
        self.return_register = return_register;

        let mut block = self.function_mut().entry();
        for stmt in stmts {
            block = unpack!(self.lower_stmt(block, stmt));
        }
        if !self.function_mut().blocks[block].is_terminated() {
            self.push(block, Instruction::new(Opcode::Return));
        }

        let function = self.current_function.take().expect("set just above");
        self.program.add_function(function);
    }

    /// Create the `Object` for a declared variable at its analyzer-
    /// assigned offset, and record which symbol it belongs to so later
    /// identifier references can find it. Whether it lands in the
    /// current function's locals or the program's globals follows
    /// whether there is a current function, exactly as the analyzer's
    /// `Allocator` chooses `Automatic` vs `Static`.
    fn register_object(&mut self, decl: &Decl, symbol: SymbolId) -> ObjectId {
        let name = decl.identifier.clone().unwrap_or_default();
        let size = decl.ty.size(&self.target).unwrap_or(0);
        let alignment = decl.ty.align(&self.target).unwrap_or(1).max(1);
        let offset = self
            .table
            .symbol(symbol)
            .address
            .expect("the analyzer allocates an address for every object declaration")
            .offset;

        if self.current_function.is_some() {
            let object = Object::new(name, size, alignment, offset, ObjectStorage::Local);
            let id = self.function_mut().add_local(object);
            self.locals.insert(symbol, id);
            id
        } else {
            let object = Object::new(name, size, alignment, offset, ObjectStorage::Global);
            let id = self.program.add_global(object);
            self.globals.insert(symbol, id);
            id
        }
    }

    /// Register a global's `Object` and, if it has an initializer,
    /// lower the assignment into the synthetic `$globals_init` function
    /// (there is no top-level block for it to run in otherwise).
    fn lower_global_decl(&mut self, decl: &Decl, symbol: SymbolId, init: &Expr) {
        let object = self.register_object(decl, symbol);

        let mut function = self.global_init.take().unwrap_or_else(|| Function::new(GLOBAL_INIT_NAME));
        let cursor = self.global_init_cursor.take().unwrap_or_else(|| function.entry());
        self.current_function = Some(function);

        let mut b = cursor;
        let rval = unpack!(b = self.lower_expr(b, init));
        let addr = self.new_any();
        self.push(b, Instruction::new(Opcode::LoadA).with_dest(addr).with_object(object));
        let size = decl.ty.size(&self.target).unwrap_or(0);
        self.push(b, Instruction::new(Self::store_op(size)).with_left(addr).with_right(rval));

        self.global_init_cursor = Some(b);
        function = self.current_function.take().expect("set just above");
        self.global_init = Some(function);
    }

    fn object_for_symbol(&self, symbol: SymbolId) -> ObjectId {
        self.locals
            .get(&symbol)
            .or_else(|| self.globals.get(&symbol))
            .copied()
            .expect("every resolved identifier has a registered object by the time it's used")
    }

    fn intern_string(&mut self, value: &str) -> ObjectId {
        let size = value.len() as u32 + 1;
        let offset = self.string_offset;
        self.string_offset += size;
        let name = format!(".str{}", self.string_count);
        self.string_count += 1;
        self.program.add_global(Object::new(name, size, 1, offset, ObjectStorage::Global))
    }

    // --- Statements -----------------------------------------------------

    fn lower_stmt(&mut self, block: BasicBlockId, stmt: &Stmt) -> BlockAnd<()> {
        match &stmt.kind {
            StmtKind::Decl(decl) => self.lower_decl_stmt(block, decl),
            StmtKind::Expr(expr) => {
                let mut b = block;
                unpack!(b = self.lower_expr(b, expr));
                b.unit()
            }
            StmtKind::Block(stmts) => {
                let mut b = block;
                for stmt in stmts {
                    b = unpack!(self.lower_stmt(b, stmt));
                }
                b.unit()
            }
            StmtKind::While { cond, body } => self.lower_while(block, cond, body),
            StmtKind::If { cond, then_branch, else_branch } => {
                self.lower_if(block, cond, then_branch, else_branch.as_deref())
            }
            StmtKind::Return { value } => self.lower_return(block, value.as_ref()),
        }
    }

    fn lower_decl_stmt(&mut self, block: BasicBlockId, decl: &Decl) -> BlockAnd<()> {
        let Some(symbol) = decl.resolved_symbol else { return block.unit() };
        if decl.is_function() {
            return block.unit();
        }
        let object = self.register_object(decl, symbol);

        if let DeclBody::Initializer(init) = &decl.body {
            let mut b = block;
            let rval = unpack!(b = self.lower_expr(b, init));
            let addr = self.new_any();
            self.push(b, Instruction::new(Opcode::LoadA).with_dest(addr).with_object(object));
            let size = decl.ty.size(&self.target).unwrap_or(0);
            self.push(b, Instruction::new(Self::store_op(size)).with_left(addr).with_right(rval));
            return b.unit();
        }
        block.unit()
    }

    fn lower_while(&mut self, block: BasicBlockId, cond: &Expr, body: &Stmt) -> BlockAnd<()> {
        let header = self.new_block("header");
        let body_block = self.new_block("body");
        let exit = self.new_block("exit");
        self.terminate_jump(block, header);

        let mut hb = header;
        let cond_reg = unpack!(hb = self.lower_expr(hb, cond));
        self.terminate_branch(hb, cond_reg, body_block, exit);

        let mut bb = body_block;
        bb = unpack!(self.lower_stmt(bb, body));
        self.terminate_jump(bb, header);

        exit.unit()
    }

    fn lower_if(
        &mut self,
        block: BasicBlockId,
        cond: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> BlockAnd<()> {
        let then_block = self.new_block("then");
        let join = self.new_block("join");
        let else_target = if else_branch.is_some() { self.new_block("else") } else { join };

        let mut b = block;
        let cond_reg = unpack!(b = self.lower_expr(b, cond));
        self.terminate_branch(b, cond_reg, then_block, else_target);

        let mut tb = then_block;
        tb = unpack!(self.lower_stmt(tb, then_branch));
        self.terminate_jump(tb, join);

        if let Some(else_branch) = else_branch {
            let mut eb = else_target;
            eb = unpack!(self.lower_stmt(eb, else_branch));
            self.terminate_jump(eb, join);
        }

        join.unit()
    }

    fn lower_return(&mut self, block: BasicBlockId, value: Option<&Expr>) -> BlockAnd<()> {
        let mut b = block;
        if let Some(value) = value {
            let reg = unpack!(b = self.lower_expr(b, value));
            if let Some(ret_reg) = self.return_register {
                self.push(b, Instruction::new(Opcode::Mov).with_dest(ret_reg).with_left(reg));
            }
        }
        self.push(b, Instruction::new(Opcode::Return));
        b.unit()
    }

    // --- Expressions ------------------------------------------------------

    fn lower_expr(&mut self, block: BasicBlockId, expr: &Expr) -> BlockAnd<RegisterId> {
        match &expr.kind {
            ExprKind::Primary(primary) => self.lower_primary(block, primary, expr),
            ExprKind::Unary { op, right } => self.lower_unary(block, *op, right, expr),
            ExprKind::Postfix { op, left, args, index } => {
                self.lower_postfix(block, *op, left, args, index.as_deref(), expr)
            }
            ExprKind::Binary { op, left, right } => self.lower_binary(block, *op, left, right),
            ExprKind::Cast { to, right } => self.lower_cast(block, to, right),
            ExprKind::Tertiary { cond, then_branch, else_branch } => {
                self.lower_tertiary(block, cond, then_branch, else_branch)
            }
            ExprKind::Assign { left, right } => self.lower_assign(block, left, right),
        }
    }

    fn lower_primary(&mut self, block: BasicBlockId, primary: &Primary, expr: &Expr) -> BlockAnd<RegisterId> {
        match &primary.kind {
            PrimaryKind::Constant(value) => {
                let dest = self.new_any();
                self.push(block, Instruction::new(Opcode::LoadI).with_dest(dest).with_value(*value));
                block.and(dest)
            }
            PrimaryKind::StringLiteral(value) => {
                let object = self.intern_string(value);
                let dest = self.new_any();
                self.push(block, Instruction::new(Opcode::LoadA).with_dest(dest).with_object(object));
                block.and(dest)
            }
            PrimaryKind::Identifier(_) => {
                let symbol = primary.resolved_symbol.expect("analyzer resolves every identifier it doesn't diagnose");
                let object = self.object_for_symbol(symbol);
                let addr = self.new_any();
                self.push(block, Instruction::new(Opcode::LoadA).with_dest(addr).with_object(object));
                // An array used by value decays to the address of its
                // first element; there is nothing to load.
                if expr.ty.as_ref().is_some_and(|ty| ty.is_array()) {
                    return block.and(addr);
                }
                let dest = self.new_any();
                self.push(block, Instruction::new(Self::load_op(self.expr_size(expr))).with_dest(dest).with_left(addr));
                block.and(dest)
            }
        }
    }

    fn lower_unary(&mut self, block: BasicBlockId, op: UnaryOp, right: &Expr, expr: &Expr) -> BlockAnd<RegisterId> {
        match op {
            UnaryOp::AddressOf => self.lower_address(block, right),
            UnaryOp::Deref => {
                let mut b = block;
                let addr = unpack!(b = self.lower_expr(b, right));
                let dest = self.new_any();
                self.push(b, Instruction::new(Self::load_op(self.expr_size(expr))).with_dest(dest).with_left(addr));
                b.and(dest)
            }
            UnaryOp::Plus => self.lower_expr(block, right),
            UnaryOp::Neg => {
                let mut b = block;
                let operand = unpack!(b = self.lower_expr(b, right));
                let zero = self.new_any();
                self.push(b, Instruction::new(Opcode::LoadI).with_dest(zero).with_value(0));
                let dest = self.new_any();
                self.push(b, Instruction::binary(Opcode::Sub, dest, zero, operand));
                b.and(dest)
            }
            UnaryOp::BitNot => {
                let mut b = block;
                let operand = unpack!(b = self.lower_expr(b, right));
                let dest = self.new_any();
                self.push(b, Instruction::new(Opcode::Flip).with_dest(dest).with_left(operand));
                b.and(dest)
            }
            UnaryOp::LogicalNot => {
                let mut b = block;
                let operand = unpack!(b = self.lower_expr(b, right));
                let dest = self.new_any();
                self.push(b, Instruction::new(Opcode::Not).with_dest(dest).with_left(operand));
                b.and(dest)
            }
        }
    }

    /// Lower `expr` to the register holding its *address* rather than
    /// its value — used by assignment's left side and `&`. The
    /// analyzer only ever allows an identifier, a `*` dereference, or a
    /// subscript as an lvalue, so those are the only shapes handled.
    fn lower_address(&mut self, block: BasicBlockId, expr: &Expr) -> BlockAnd<RegisterId> {
        match &expr.kind {
            ExprKind::Primary(Primary { kind: PrimaryKind::Identifier(_), resolved_symbol: Some(symbol) }) => {
                let object = self.object_for_symbol(*symbol);
                let dest = self.new_any();
                self.push(block, Instruction::new(Opcode::LoadA).with_dest(dest).with_object(object));
                block.and(dest)
            }
            ExprKind::Unary { op: UnaryOp::Deref, right } => self.lower_expr(block, right),
            ExprKind::Postfix { op: PostfixOp::Index, left, index: Some(index), .. } => {
                self.lower_index_address(block, left, index)
            }
            _ => unreachable!("analyzer only allows identifiers, dereferences, and subscripts as lvalues"),
        }
    }

    fn lower_index_address(&mut self, block: BasicBlockId, left: &Expr, index: &Expr) -> BlockAnd<RegisterId> {
        let mut b = block;
        let base = unpack!(b = self.lower_expr(b, left));
        let idx = unpack!(b = self.lower_expr(b, index));
        let elem_size = left.ty.as_ref().map(|ty| self.pointee_size(ty)).unwrap_or(1);
        let scaled = self.scale(b, idx, elem_size);
        let dest = self.new_any();
        self.push(b, Instruction::binary(Opcode::Add, dest, base, scaled));
        b.and(dest)
    }

    fn lower_postfix(
        &mut self,
        block: BasicBlockId,
        op: PostfixOp,
        left: &Expr,
        args: &[Expr],
        index: Option<&Expr>,
        expr: &Expr,
    ) -> BlockAnd<RegisterId> {
        match op {
            PostfixOp::Call => self.lower_call(block, left, args),
            PostfixOp::Index => {
                let index = index.expect("an Index postfix always carries an index expression");
                let mut b = block;
                let addr = unpack!(b = self.lower_index_address(b, left, index));
                let dest = self.new_any();
                self.push(b, Instruction::new(Self::load_op(self.expr_size(expr))).with_dest(dest).with_left(addr));
                b.and(dest)
            }
        }
    }

    fn lower_call(&mut self, block: BasicBlockId, callee: &Expr, args: &[Expr]) -> BlockAnd<RegisterId> {
        let mut b = block;
        let mut arg_regs = Vec::with_capacity(args.len());
        for arg in args {
            let reg = unpack!(b = self.lower_expr(b, arg));
            arg_regs.push(reg);
        }
        for (i, reg) in arg_regs.into_iter().enumerate() {
            let slot = self.argument_slot(i);
            self.push(b, Instruction::new(Opcode::Mov).with_dest(slot).with_left(reg));
        }

        let name = match &callee.kind {
            ExprKind::Primary(Primary { kind: PrimaryKind::Identifier(name), .. }) => name.clone(),
            _ => unreachable!("the analyzer only accepts a function-typed callee, always a named function"),
        };
        let dest = self.new_any();
        self.push(b, Instruction::new(Opcode::Call).with_dest(dest).with_callee(name));
        b.and(dest)
    }

    fn lower_cast(&mut self, block: BasicBlockId, to: &Rc<CType>, right: &Expr) -> BlockAnd<RegisterId> {
        let mut b = block;
        let inner = unpack!(b = self.lower_expr(b, right));
        let Some(from) = right.ty.as_ref() else { return b.and(inner) };

        let narrows_to_signed_narrow = matches!(to.shape, Shape::Basic(BasicKind::SignedChar | BasicKind::SignedShortInt))
            && to.size(&self.target).unwrap_or(0) < from.size(&self.target).unwrap_or(0);
        if !narrows_to_signed_narrow {
            return b.and(inner);
        }

        let op = if matches!(to.shape, Shape::Basic(BasicKind::SignedChar)) { Opcode::Sext8 } else { Opcode::Sext16 };
        let dest = self.new_any();
        self.push(b, Instruction::new(op).with_dest(dest).with_left(inner));
        b.and(dest)
    }

    fn lower_tertiary(
        &mut self,
        block: BasicBlockId,
        cond: &Expr,
        then_branch: &Expr,
        else_branch: &Expr,
    ) -> BlockAnd<RegisterId> {
        let mut b = block;
        let cond_reg = unpack!(b = self.lower_expr(b, cond));
        let then_block = self.new_block("then");
        let else_block = self.new_block("else");
        let join = self.new_block("join");
        self.terminate_branch(b, cond_reg, then_block, else_block);
        let dest = self.new_any();

        let mut tb = then_block;
        let then_reg = unpack!(tb = self.lower_expr(tb, then_branch));
        self.push(tb, Instruction::new(Opcode::Mov).with_dest(dest).with_left(then_reg));
        self.terminate_jump(tb, join);

        let mut eb = else_block;
        let else_reg = unpack!(eb = self.lower_expr(eb, else_branch));
        self.push(eb, Instruction::new(Opcode::Mov).with_dest(dest).with_left(else_reg));
        self.terminate_jump(eb, join);

        join.and(dest)
    }

    /// `&&`/`||` share the tertiary's block-plus-join shape: the left
    /// operand is the condition, one arm short-circuits by reusing its
    /// (already zero-or-nonzero) value, the other evaluates the right
    /// operand. Neither arm normalizes to a strict 0/1 — the surviving
    /// operand's raw value becomes the result, matching how the rest of
    /// this IR represents truthiness.
    fn lower_logical(&mut self, block: BasicBlockId, op: BinaryOp, left: &Expr, right: &Expr) -> BlockAnd<RegisterId> {
        let mut b = block;
        let left_reg = unpack!(b = self.lower_expr(b, left));
        let short_circuit = self.new_block("short_circuit");
        let evaluate_rhs = self.new_block("rhs");
        let join = self.new_block("join");

        let (on_true, on_false) = match op {
            BinaryOp::LogicalAnd => (evaluate_rhs, short_circuit),
            BinaryOp::LogicalOr => (short_circuit, evaluate_rhs),
            _ => unreachable!("lower_logical only handles && and ||"),
        };
        self.terminate_branch(b, left_reg, on_true, on_false);

        let dest = self.new_any();
        self.push(short_circuit, Instruction::new(Opcode::Mov).with_dest(dest).with_left(left_reg));
        self.terminate_jump(short_circuit, join);

        let mut rb = evaluate_rhs;
        let right_reg = unpack!(rb = self.lower_expr(rb, right));
        self.push(rb, Instruction::new(Opcode::Mov).with_dest(dest).with_left(right_reg));
        self.terminate_jump(rb, join);

        join.and(dest)
    }

    fn lower_binary(&mut self, block: BasicBlockId, op: BinaryOp, left: &Expr, right: &Expr) -> BlockAnd<RegisterId> {
        if matches!(op, BinaryOp::LogicalAnd | BinaryOp::LogicalOr) {
            return self.lower_logical(block, op, left, right);
        }

        let mut b = block;
        let mut left_reg = unpack!(b = self.lower_expr(b, left));
        let mut right_reg = unpack!(b = self.lower_expr(b, right));

        if matches!(op, BinaryOp::Add | BinaryOp::Sub) {
            match (left.ty.as_ref(), right.ty.as_ref()) {
                (Some(lt), Some(rt)) if Self::is_pointer_like(lt) && rt.is_basic() => {
                    let elem = self.pointee_size(lt);
                    right_reg = self.scale(b, right_reg, elem);
                }
                (Some(lt), Some(rt)) if lt.is_basic() && Self::is_pointer_like(rt) && op == BinaryOp::Add => {
                    let elem = self.pointee_size(rt);
                    left_reg = self.scale(b, left_reg, elem);
                }
                _ => {}
            }
        }

        let dest = self.new_any();
        match op {
            BinaryOp::Add => self.push(b, Instruction::binary(Opcode::Add, dest, left_reg, right_reg)),
            BinaryOp::Sub => self.push(b, Instruction::binary(Opcode::Sub, dest, left_reg, right_reg)),
            BinaryOp::Mul => self.push(b, Instruction::binary(Opcode::Mul, dest, left_reg, right_reg)),
            BinaryOp::Div => self.push(b, Instruction::binary(Opcode::Div, dest, left_reg, right_reg)),
            BinaryOp::Mod => self.push(b, Instruction::binary(Opcode::Mod, dest, left_reg, right_reg)),
            BinaryOp::Shl => self.push(b, Instruction::binary(Opcode::Sll, dest, left_reg, right_reg)),
            BinaryOp::Shr => self.push(b, Instruction::binary(Opcode::Slr, dest, left_reg, right_reg)),
            BinaryOp::BitAnd => self.push(b, Instruction::binary(Opcode::And, dest, left_reg, right_reg)),
            BinaryOp::BitOr => self.push(b, Instruction::binary(Opcode::Or, dest, left_reg, right_reg)),
            BinaryOp::BitXor => self.push(b, Instruction::binary(Opcode::Xor, dest, left_reg, right_reg)),
            BinaryOp::Eq => self.push(b, Instruction::binary(Opcode::Eq, dest, left_reg, right_reg)),
            BinaryOp::Lt => self.push(b, Instruction::binary(Opcode::Lt, dest, left_reg, right_reg)),
            BinaryOp::Le => self.push(b, Instruction::binary(Opcode::Le, dest, left_reg, right_reg)),
            // No dedicated GT/GE opcode: the operand order is swapped instead.
            BinaryOp::Gt => self.push(b, Instruction::binary(Opcode::Lt, dest, right_reg, left_reg)),
            BinaryOp::Ge => self.push(b, Instruction::binary(Opcode::Le, dest, right_reg, left_reg)),
            BinaryOp::Ne => {
                let eq = self.new_any();
                self.push(b, Instruction::binary(Opcode::Eq, eq, left_reg, right_reg));
                self.push(b, Instruction::new(Opcode::Not).with_dest(dest).with_left(eq));
            }
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => unreachable!("handled above"),
        }
        b.and(dest)
    }

    fn lower_assign(&mut self, block: BasicBlockId, left: &Expr, right: &Expr) -> BlockAnd<RegisterId> {
        let mut b = block;
        let rval = unpack!(b = self.lower_expr(b, right));
        let addr = unpack!(b = self.lower_address(b, left));
        let size = left.ty.as_ref().and_then(|ty| ty.size(&self.target)).unwrap_or(self.target.pointer_size);
        self.push(b, Instruction::new(Self::store_op(size)).with_left(addr).with_right(rval));
        b.and(rval)
    }

    // --- Shared helpers -------------------------------------------------

    fn function_mut(&mut self) -> &mut Function {
        self.current_function.as_mut().expect("expression lowering only happens inside a function body")
    }

    fn push(&mut self, block: BasicBlockId, instruction: Instruction) {
        self.function_mut().blocks[block].push(instruction);
    }

    fn new_any(&mut self) -> RegisterId {
        self.function_mut().new_register(RegisterKind::Any)
    }

    fn new_block(&mut self, label: &str) -> BasicBlockId {
        self.function_mut().new_block(label)
    }

    fn terminate_jump(&mut self, from: BasicBlockId, to: BasicBlockId) {
        self.push(from, Instruction::new(Opcode::Jump).with_jump_true(to));
        self.function_mut().link(from, to);
    }

    fn terminate_branch(&mut self, from: BasicBlockId, cond: RegisterId, on_true: BasicBlockId, on_false: BasicBlockId) {
        self.push(from, Instruction::new(Opcode::BranchZ).with_left(cond).with_jump_true(on_true).with_jump_false(on_false));
        self.function_mut().link(from, on_true);
        self.function_mut().link(from, on_false);
    }

    fn argument_slot(&mut self, index: usize) -> RegisterId {
        while self.argument_slots.len() <= index {
            let reg = self.function_mut().new_register(RegisterKind::Argument);
            self.argument_slots.push(reg);
        }
        self.argument_slots[index]
    }

    /// Scale `reg` by `factor`, emitting a `MUL` only when the factor
    /// isn't the identity — pointer arithmetic over `char`/`void`-sized
    /// elements needs no scaling instruction at all.
    fn scale(&mut self, block: BasicBlockId, reg: RegisterId, factor: u32) -> RegisterId {
        if factor <= 1 {
            return reg;
        }
        let factor_reg = self.new_any();
        self.push(block, Instruction::new(Opcode::LoadI).with_dest(factor_reg).with_value(factor as i64));
        let dest = self.new_any();
        self.push(block, Instruction::binary(Opcode::Mul, dest, reg, factor_reg));
        dest
    }

    fn is_pointer_like(ty: &CType) -> bool {
        ty.is_pointer() || ty.is_array()
    }

    fn pointee_size(&self, ty: &CType) -> u32 {
        match &ty.shape {
            Shape::Pointer(inner) | Shape::Array(inner, _) => inner.size(&self.target).unwrap_or(1).max(1),
            _ => 1,
        }
    }

    fn expr_size(&self, expr: &Expr) -> u32 {
        expr.ty.as_ref().and_then(|ty| ty.size(&self.target)).unwrap_or(self.target.pointer_size)
    }

    fn load_op(size: u32) -> Opcode {
        match size {
            1 => Opcode::Load8,
            2 => Opcode::Load16,
            _ => Opcode::Load32,
        }
    }

    fn store_op(size: u32) -> Opcode {
        match size {
            1 => Opcode::Store8,
            2 => Opcode::Store16,
            _ => Opcode::Store32,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use acc_ast::{Decl, DeclBody, DeclKind, Expr, ExprKind, Primary, PrimaryKind, Stmt, StmtKind};
    use acc_source::{Position, Span};
    use acc_symbol::{Address, AddressKind, SymbolTable};
    use acc_types::CType;

    use super::*;

    fn span() -> Span {
        Span::new(Position::new(1, 1))
    }

    fn int_ty() -> Rc<CType> {
        Rc::new(CType::basic(BasicKind::SignedInt))
    }

    fn typed(mut expr: Expr, ty: Rc<CType>) -> Expr {
        expr.ty = Some(ty);
        expr
    }

    /// A no-argument function returning `int`, with `stmts` as its body,
    /// registered in `table` with a fresh symbol.
    fn function_decl(table: &mut SymbolTable, name: &str, stmts: Vec<Stmt>) -> Decl {
        let fn_ty = Rc::new(CType::function_of(int_ty(), vec![]).expect("valid signature"));
        let symbol = table.put(table.root(), name, fn_ty.clone());
        let mut decl = Decl::new(DeclKind::Concrete, fn_ty, Some(name.into()), DeclBody::Body(stmts), span());
        decl.resolved_symbol = Some(symbol);
        decl
    }

    fn unit_of(decls: Vec<Decl>) -> TranslationUnit {
        TranslationUnit::new(decls)
    }

    #[test]
    fn constant_return_lowers_to_loadi_then_return() {
        let mut table = SymbolTable::new();
        let value = typed(Expr::constant(3, span()), int_ty());
        let body = vec![Stmt::new(StmtKind::Return { value: Some(value) }, span())];
        let decl = function_decl(&mut table, "f", body);

        let program = IrGen::new(&table, Target::default()).generate(&unit_of(vec![decl]));

        let function = program.function("f").expect("f was lowered");
        let entry = function.entry();
        let ops: Vec<Opcode> = function.blocks[entry].instructions.iter().map(|i| i.op).collect();
        assert_eq!(ops, vec![Opcode::LoadI, Opcode::Mov, Opcode::Return]);
    }

    #[test]
    fn local_declaration_with_initializer_stores_into_its_object() {
        let mut table = SymbolTable::new();
        let x_symbol = table.put(table.root(), "x", int_ty());
        table.set_address(x_symbol, Address { kind: AddressKind::Automatic, offset: 0 });

        let mut x_decl = Decl::new(DeclKind::Concrete, int_ty(), Some("x".into()), DeclBody::Initializer(typed(Expr::constant(5, span()), int_ty())), span());
        x_decl.resolved_symbol = Some(x_symbol);

        let body = vec![Stmt::new(StmtKind::Decl(x_decl), span())];
        let decl = function_decl(&mut table, "f", body);

        let program = IrGen::new(&table, Target::default()).generate(&unit_of(vec![decl]));

        let function = program.function("f").expect("f was lowered");
        let entry = function.entry();
        let ops: Vec<Opcode> = function.blocks[entry].instructions.iter().map(|i| i.op).collect();
        assert_eq!(ops[0], Opcode::LoadI);
        assert!(ops.contains(&Opcode::LoadA));
        assert!(ops.contains(&Opcode::Store32));
    }

    #[test]
    fn while_loop_produces_header_body_exit_with_back_edge() {
        let mut table = SymbolTable::new();
        let cond = typed(Expr::constant(1, span()), int_ty());
        let while_stmt = Stmt::new(
            StmtKind::While { cond, body: Box::new(Stmt::new(StmtKind::Block(vec![]), span())) },
            span(),
        );
        let decl = function_decl(&mut table, "f", vec![while_stmt]);

        let program = IrGen::new(&table, Target::default()).generate(&unit_of(vec![decl]));

        let function = program.function("f").expect("f was lowered");
        // entry, header, body, exit
        assert_eq!(function.blocks.len(), 4);

        let header = function.blocks.iter_enumerated().find(|(_, b)| b.label == "header").unwrap().0;
        let body = function.blocks.iter_enumerated().find(|(_, b)| b.label == "body").unwrap().0;

        // the body block's jump target is the header, closing the back edge.
        let body_jump = function.blocks[body].instructions.last().unwrap();
        assert_eq!(body_jump.op, Opcode::Jump);
        assert_eq!(body_jump.jump_true, Some(header));

        let header_branch = function.blocks[header].instructions.last().unwrap();
        assert_eq!(header_branch.op, Opcode::BranchZ);
    }

    #[test]
    fn logical_and_evaluates_right_operand_in_a_distinct_block() {
        let mut table = SymbolTable::new();
        let left = typed(Expr::constant(1, span()), int_ty());
        let right = typed(Expr::constant(2, span()), int_ty());
        let and_expr = typed(
            Expr::new(ExprKind::Binary { op: BinaryOp::LogicalAnd, left: Box::new(left), right: Box::new(right) }, span()),
            int_ty(),
        );
        let body = vec![Stmt::new(StmtKind::Expr(and_expr), span())];
        let decl = function_decl(&mut table, "f", body);

        let program = IrGen::new(&table, Target::default()).generate(&unit_of(vec![decl]));

        let function = program.function("f").expect("f was lowered");
        // entry, short_circuit, rhs, join
        assert_eq!(function.blocks.len(), 4);
        let rhs = function.blocks.iter_enumerated().find(|(_, b)| b.label == "rhs").unwrap().1;
        assert!(rhs.instructions.iter().any(|i| i.op == Opcode::LoadI && i.value == Some(2)));
        let entry = function.entry();
        assert_eq!(function.blocks[entry].instructions.last().unwrap().op, Opcode::BranchZ);
    }

    #[test]
    fn pointer_subscript_scales_the_index_by_pointee_size() {
        let mut table = SymbolTable::new();
        let ptr_ty = Rc::new(CType::pointer_to(int_ty()));
        let p_symbol = table.put(table.root(), "p", ptr_ty.clone());
        table.set_address(p_symbol, Address { kind: AddressKind::Automatic, offset: 0 });

        let p_ident = Expr::new(
            ExprKind::Primary(Primary { kind: PrimaryKind::Identifier("p".into()), resolved_symbol: Some(p_symbol) }),
            span(),
        );
        let p_ident = typed(p_ident, ptr_ty);
        let index_expr = typed(
            Expr::new(
                ExprKind::Postfix {
                    op: PostfixOp::Index,
                    left: Box::new(p_ident),
                    args: vec![],
                    index: Some(Box::new(typed(Expr::constant(3, span()), int_ty()))),
                },
                span(),
            ),
            int_ty(),
        );
        let body = vec![Stmt::new(StmtKind::Expr(index_expr), span())];
        let decl = function_decl(&mut table, "f", body);

        let program = IrGen::new(&table, Target::default()).generate(&unit_of(vec![decl]));

        let function = program.function("f").expect("f was lowered");
        let entry = function.entry();
        let ops: Vec<Opcode> = function.blocks[entry].instructions.iter().map(|i| i.op).collect();
        assert!(ops.contains(&Opcode::Mul), "scaling by a 4-byte pointee should emit a MUL");
        let scale_load = function.blocks[entry]
            .instructions
            .iter()
            .find(|i| i.op == Opcode::LoadI && i.value == Some(4));
        assert!(scale_load.is_some(), "the scale factor should be the pointee's size");
    }

    #[test]
    fn global_initializer_is_lowered_into_the_synthetic_init_function() {
        let mut table = SymbolTable::new();
        let g_symbol = table.put(table.root(), "g", int_ty());
        table.set_address(g_symbol, Address { kind: AddressKind::Static, offset: 0 });

        let mut g_decl = Decl::new(
            DeclKind::Concrete,
            int_ty(),
            Some("g".into()),
            DeclBody::Initializer(typed(Expr::constant(7, span()), int_ty())),
            span(),
        );
        g_decl.resolved_symbol = Some(g_symbol);

        let program = IrGen::new(&table, Target::default()).generate(&unit_of(vec![g_decl]));

        assert_eq!(program.globals.len(), 1);
        let init = program.function(GLOBAL_INIT_NAME).expect("synthetic init function was emitted");
        let entry = init.entry();
        let ops: Vec<Opcode> = init.blocks[entry].instructions.iter().map(|i| i.op).collect();
        assert!(ops.contains(&Opcode::Store32));
    }
}
