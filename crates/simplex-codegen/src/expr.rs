//! Expression compilation.
//!
//! Every node emits its listing fragments in textual order, compiling
//! children in between, and returns one closure. A closure that fails on its
//! own account tags the error with the site of its node's first fragment.

use std::collections::HashSet;
use std::sync::Arc;

use simplex_eval::{format_number, Env, Fault, Function, PipeStage, Value, TOPIC_TOKEN};
use simplex_types::ast::*;
use simplex_types::{CompileError, ErrorCode};

use crate::compiler::{CompiledExpr, Compiler};
use crate::error::{CodegenError, CodegenResult};

fn node<F>(f: F) -> CompiledExpr
where
    F: Fn(&Env) -> Result<Value, Fault> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn json_text(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_default()
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

fn literal_text(lit: &Literal) -> String {
    match lit {
        Literal::Number(n) if n.is_finite() => format_number(*n),
        Literal::Number(_) | Literal::Null => "null".into(),
        Literal::String(s) => json_text(s),
        Literal::Boolean(b) => b.to_string(),
    }
}

fn property_key(key: &PropertyKey) -> String {
    match key {
        PropertyKey::Identifier(ident) => ident.name.clone(),
        PropertyKey::Literal(lit, _) => literal_value(lit).property_key().unwrap_or_default(),
    }
}

/// Evaluate children left to right; `None` entries (holes) read as `undefined`.
fn eval_all(items: &[Option<CompiledExpr>], env: &Env) -> Result<Vec<Value>, Fault> {
    items
        .iter()
        .map(|item| match item {
            Some(compiled) => compiled(env),
            None => Ok(Value::Undefined),
        })
        .collect()
}

impl Compiler<'_> {
    pub(crate) fn compile_expr(&mut self, expr: &Expr) -> CodegenResult<CompiledExpr> {
        let span = expr.span;
        match &expr.kind {
            // ── Atoms ────────────────────────────────────────────────────────
            ExprKind::Literal(lit) => {
                self.emit(&literal_text(lit), span);
                let value = literal_value(lit);
                Ok(node(move |_| Ok(value.clone())))
            }
            ExprKind::Identifier(name) => {
                let site = self.emit(&format!("get(scope,{})", json_text(name)), span);
                let name = name.clone();
                Ok(node(move |env| env.lookup(&name).map_err(|e| Fault::at(e, site))))
            }
            ExprKind::TopicReference => {
                let site = self.emit(&format!("get(scope,{})", json_text(TOPIC_TOKEN)), span);
                Ok(node(move |env| env.topic().map_err(|e| Fault::at(e, site))))
            }

            // ── Operators ────────────────────────────────────────────────────
            ExprKind::Unary { op, argument } => {
                let site = self.emit(&format!("uop[\"{}\"](", op.as_str()), span);
                let argument = self.compile_expr(argument)?;
                self.emit(")", span);
                let op = *op;
                Ok(node(move |env| {
                    let value = argument(env)?;
                    let apply = env.runtime().unary_operators().get(op);
                    apply(&value).map_err(|e| Fault::at(e, site))
                }))
            }
            ExprKind::Binary { op, left, right } => {
                let site = self.emit(&format!("bop[\"{}\"](", op.as_str()), span);
                let left = self.compile_expr(left)?;
                self.emit(",", span);
                let right = self.compile_expr(right)?;
                self.emit(")", span);
                let op = *op;
                Ok(node(move |env| {
                    let a = left(env)?;
                    let b = right(env)?;
                    let apply = env.runtime().binary_operators().get(op);
                    apply(&a, &b).map_err(|e| Fault::at(e, site))
                }))
            }
            ExprKind::Logical { op, left, right } => {
                let site = self.emit(&format!("lop[\"{}\"](()=>(", op.as_str()), span);
                let left = self.compile_expr(left)?;
                self.emit("),()=>(", span);
                let right = self.compile_expr(right)?;
                self.emit("))", span);
                let op = *op;
                Ok(node(move |env| {
                    let lhs = || left(env);
                    let rhs = || right(env);
                    let apply = env.runtime().logical_operators().get(op);
                    apply(&lhs, &rhs).map_err(|fault| fault.or_site(site))
                }))
            }
            ExprKind::NullishCoalesce { left, right } => {
                self.emit("(", span);
                let left = self.compile_expr(left)?;
                self.emit("??", span);
                let right = self.compile_expr(right)?;
                self.emit(")", span);
                Ok(node(move |env| {
                    let value = left(env)?;
                    if value.is_nullish() {
                        right(env)
                    } else {
                        Ok(value)
                    }
                }))
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.emit("(bool(", span);
                let test = self.compile_expr(test)?;
                self.emit(")?", span);
                let consequent = self.compile_expr(consequent)?;
                self.emit(":", span);
                let alternate = match alternate {
                    Some(alternate) => Some(self.compile_expr(alternate)?),
                    None => {
                        self.emit("undefined", span);
                        None
                    }
                };
                self.emit(")", span);
                Ok(node(move |env| {
                    let value = test(env)?;
                    if env.runtime().cast_to_boolean(&value) {
                        consequent(env)
                    } else {
                        alternate.as_ref().map_or(Ok(Value::Undefined), |alt| alt(env))
                    }
                }))
            }

            // ── Composites ───────────────────────────────────────────────────
            ExprKind::Object(properties) => self.compile_object(properties, expr),
            ExprKind::Array(elements) => {
                self.emit("[", span);
                let mut items = Vec::with_capacity(elements.len());
                for (i, element) in elements.iter().enumerate() {
                    let last = i + 1 == elements.len();
                    items.push(match element {
                        Some(element) => Some(self.compile_expr(element)?),
                        None => None,
                    });
                    if !last {
                        self.emit(",", span);
                    }
                }
                self.emit("]", span);
                Ok(node(move |env| Ok(Value::from(eval_all(&items, env)?))))
            }

            // ── Access & Calls ───────────────────────────────────────────────
            ExprKind::Member {
                object,
                property,
                computed,
                extension: _,
            } => {
                let site = self.emit("prop(", span);
                let object = self.compile_expr(object)?;
                self.emit(",", span);
                let key = if *computed {
                    self.compile_expr(property)?
                } else {
                    let ExprKind::Identifier(name) = &property.kind else {
                        return Err(CodegenError::Internal(
                            "non-computed member property must be an identifier".into(),
                        ));
                    };
                    self.emit(&json_text(name), property.span);
                    let key = Value::from(name.as_str());
                    node(move |_| Ok(key.clone()))
                };
                self.emit(")", span);
                Ok(node(move |env| {
                    let target = object(env)?;
                    let key = key(env)?;
                    env.runtime()
                        .get_property(&target, &key)
                        .map_err(|e| Fault::at(e, site))
                }))
            }
            ExprKind::Call { callee, arguments } => self.compile_call(callee, arguments, expr),
            ExprKind::PipeSequence { head, tail } => self.compile_pipe(head, tail, expr),

            // ── Binding forms ────────────────────────────────────────────────
            ExprKind::Lambda { params, body } => self.compile_lambda(params, body, expr),
            ExprKind::Let { declarations, body } => self.compile_let(declarations, body, expr),
        }
    }

    fn compile_object(&mut self, properties: &[Property], expr: &Expr) -> CodegenResult<CompiledExpr> {
        self.emit("{", expr.span);
        let mut entries = Vec::with_capacity(properties.len());
        for (i, property) in properties.iter().enumerate() {
            let key = property_key(&property.key);
            self.emit(&json_text(&key), property.span);
            self.emit(":", property.span);
            let value = self.compile_expr(&property.value)?;
            if i + 1 < properties.len() {
                self.emit(",", expr.span);
            }
            entries.push((key, value));
        }
        self.emit("}", expr.span);
        Ok(node(move |env| {
            let mut fields = Vec::with_capacity(entries.len());
            for (key, value) in &entries {
                fields.push((key.clone(), value(env)?));
            }
            Ok(Value::object(fields))
        }))
    }

    /// Direct call, zero-argument call, or (with placeholders) a call that
    /// yields a partially applied function.
    fn compile_call(
        &mut self,
        callee: &Expr,
        arguments: &[Argument],
        expr: &Expr,
    ) -> CodegenResult<CompiledExpr> {
        let span = expr.span;

        if arguments.is_empty() {
            let site = self.emit("call(", span);
            let callee = self.compile_expr(callee)?;
            self.emit(",null)", span);
            return Ok(node(move |env| {
                let function = callee(env)?;
                env.runtime()
                    .call_function(&function, None)
                    .map_err(|fault| fault.or_site(site))
            }));
        }

        let placeholders: Vec<String> = arguments
            .iter()
            .enumerate()
            .filter(|(_, arg)| matches!(arg, Argument::Placeholder(_)))
            .map(|(i, _)| format!("a{i}"))
            .collect();
        let curried = !placeholders.is_empty();
        if curried {
            self.emit(&format!("(scope=>({})=>", placeholders.join(",")), span);
        }

        let site = self.emit("call(", span);
        let callee = self.compile_expr(callee)?;
        self.emit(",[", span);
        let mut args = Vec::with_capacity(arguments.len());
        for (i, argument) in arguments.iter().enumerate() {
            args.push(match argument {
                Argument::Expr(arg) => Some(self.compile_expr(arg)?),
                Argument::Placeholder(placeholder) => {
                    self.emit(&format!("a{i}"), *placeholder);
                    None
                }
            });
            if i + 1 < arguments.len() {
                self.emit(",", span);
            }
        }
        self.emit("])", span);

        if !curried {
            return Ok(node(move |env| {
                let function = callee(env)?;
                let values = eval_all(&args, env)?;
                env.runtime()
                    .call_function(&function, Some(values))
                    .map_err(|fault| fault.or_site(site))
            }));
        }

        self.emit(")(scope)", span);
        Ok(node(move |env| {
            let function = callee(env)?;
            let mut bound = Vec::with_capacity(args.len());
            for arg in &args {
                bound.push(match arg {
                    Some(compiled) => Some(compiled(env)?),
                    None => None,
                });
            }
            let env = env.clone();
            let partial = Function::from_faulting(move |supplied: &[Value]| {
                let mut supplied = supplied.iter();
                let values = bound
                    .iter()
                    .map(|slot| match slot {
                        Some(value) => value.clone(),
                        None => supplied.next().cloned().unwrap_or_default(),
                    })
                    .collect();
                env.runtime()
                    .call_function(&function, Some(values))
                    .map_err(|fault| fault.or_site(site))
            });
            Ok(Value::Function(partial))
        }))
    }

    fn compile_pipe(
        &mut self,
        head: &Expr,
        tail: &[simplex_types::ast::PipeStage],
        expr: &Expr,
    ) -> CodegenResult<CompiledExpr> {
        let site = self.emit("pipe(", expr.span);
        let head = self.compile_expr(head)?;
        self.emit(",[", expr.span);
        let mut stages = Vec::with_capacity(tail.len());
        for (i, stage) in tail.iter().enumerate() {
            let stage_span = stage.expr.span;
            self.emit(
                &format!(
                    "{{opt:{},next:(scope=>topic=>{{scope=[[{}],[topic],scope];return ",
                    stage.optional,
                    json_text(TOPIC_TOKEN)
                ),
                stage_span,
            );
            let body = self.compile_expr(&stage.expr)?;
            self.emit("})(scope)}", stage_span);
            if i + 1 < tail.len() {
                self.emit(",", stage_span);
            }
            stages.push((stage.optional, body));
        }
        self.emit("])", expr.span);

        let topic: Arc<[String]> = Arc::from(vec![TOPIC_TOKEN.to_owned()]);
        Ok(node(move |env| {
            let head = head(env)?;
            let stages: Vec<PipeStage<'_>> = stages
                .iter()
                .map(|(optional, body)| {
                    let topic = Arc::clone(&topic);
                    PipeStage::new(*optional, move |value| {
                        body(&env.with_frame(Arc::clone(&topic), vec![value]))
                    })
                })
                .collect();
            env.runtime()
                .pipe(head, &stages)
                .map_err(|fault| fault.or_site(site))
        }))
    }

    fn compile_lambda(&mut self, params: &[Ident], body: &Expr, expr: &Expr) -> CodegenResult<CompiledExpr> {
        let span = expr.span;

        if params.is_empty() {
            self.emit("(()=>", span);
            let body = self.compile_expr(body)?;
            self.emit(")", span);
            return Ok(node(move |env| {
                let env = env.clone();
                let body = Arc::clone(&body);
                Ok(Value::Function(Function::from_faulting(move |_| body(&env))))
            }));
        }

        let positional: Vec<String> = (0..params.len()).map(|i| format!("p{i}")).collect();
        let positional = positional.join(",");
        let quoted: Vec<String> = params.iter().map(|p| json_text(&p.name)).collect();
        self.emit(
            &format!("((scope,params)=>function({positional}){{scope=[params,[{positional}],scope];return "),
            span,
        );
        let body = self.compile_expr(body)?;
        self.emit(&format!("}})(scope,[{}])", quoted.join(",")), span);

        let names: Arc<[String]> = params.iter().map(|p| p.name.clone()).collect();
        Ok(node(move |env| {
            let env = env.clone();
            let body = Arc::clone(&body);
            let names = Arc::clone(&names);
            Ok(Value::Function(Function::from_faulting(move |args| {
                let values = args.iter().take(names.len()).cloned().collect();
                body(&env.with_frame(Arc::clone(&names), values))
            })))
        }))
    }

    /// Each declaration opens a frame seen by later initializers and the
    /// body. An initializer never sees its own name.
    fn compile_let(
        &mut self,
        declarations: &[Declaration],
        body: &Expr,
        expr: &Expr,
    ) -> CodegenResult<CompiledExpr> {
        let mut seen = HashSet::new();
        for declaration in declarations {
            if !seen.insert(declaration.id.name.as_str()) {
                let error = CompileError::new(
                    ErrorCode::DUPLICATE_LET_BINDING,
                    format!(
                        "\"{}\" name defined inside let expression was repeated",
                        declaration.id.name
                    ),
                    declaration.id.span,
                )
                .with_expression(self.source);
                return Err(error.into());
            }
        }

        let span = expr.span;
        self.emit(
            "(scope=>{var _varNames=[];var _varValues=[];scope=[_varNames,_varValues,scope];",
            span,
        );
        let mut bindings = Vec::with_capacity(declarations.len());
        for declaration in declarations {
            self.emit("_varValues.push(", declaration.span);
            let init = self.compile_expr(&declaration.init)?;
            self.emit(");", declaration.span);
            self.emit("_varNames.push(", declaration.span);
            self.emit(&json_text(&declaration.id.name), declaration.id.span);
            self.emit(");", declaration.span);
            let names: Arc<[String]> = Arc::from(vec![declaration.id.name.clone()]);
            bindings.push((names, init));
        }
        self.emit("return ", span);
        let body = self.compile_expr(body)?;
        self.emit("})(scope)", span);

        Ok(node(move |env| {
            let mut scope = env.clone();
            for (names, init) in &bindings {
                let value = init(&scope)?;
                scope = scope.with_frame(Arc::clone(names), vec![value]);
            }
            body(&scope)
        }))
    }
}
