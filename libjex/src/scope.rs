//! Persistent execution scope that submitted source runs against.

use boa_engine::property::Attribute;
use boa_engine::{js_string, Context, JsError, JsString, JsValue, Source};
use boa_runtime::Console;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Handle to one scope of variable bindings, owned by one connection.
///
/// The engine context is not `Send`, so each scope lives on a dedicated
/// thread for the lifetime of the handle; operations are forwarded over a
/// channel and answered over oneshots. Dropping the handle stops the
/// thread and releases every binding.
pub struct Scope {
    op_tx: mpsc::UnboundedSender<Op>,
}

/// Errors from running submitted code against a [Scope]
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The submitted code raised a fault: a syntax error, an unbound
    /// reference, or a thrown exception
    #[error("{message}")]
    Fault { message: String, detail: String },

    /// The scope's thread is gone
    #[error("Execution scope terminated")]
    Terminated,
}

/// Operations processed by the scope thread
enum Op {
    Execute {
        source: String,
        resp_tx: oneshot::Sender<Result<(), Error>>,
    },
    Evaluate {
        source: String,
        resp_tx: oneshot::Sender<Result<Value, Error>>,
    },
    EvaluateDisplay {
        source: String,
        resp_tx: oneshot::Sender<Result<String, Error>>,
    },
    Bind {
        name: String,
        value: Value,
        resp_tx: oneshot::Sender<Result<(), Error>>,
    },
}

impl Scope {
    /// Create a fresh scope seeded with the host bindings
    pub fn spawn() -> Self {
        let (op_tx, op_rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || run(op_rx));
        Self { op_tx }
    }

    /// Run source as statements for side effect, discarding whatever the
    /// executed code evaluates to
    pub async fn execute(&self, source: &str) -> Result<(), Error> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.op_tx
            .send(Op::Execute {
                source: source.to_string(),
                resp_tx,
            })
            .map_err(|_| Error::Terminated)?;
        resp_rx.await.map_err(|_| Error::Terminated)?
    }

    /// Run source as an expression and return its value as JSON. Values
    /// JSON cannot carry (functions, cyclic structures, `undefined`)
    /// come back as null
    pub async fn evaluate(&self, source: &str) -> Result<Value, Error> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.op_tx
            .send(Op::Evaluate {
                source: source.to_string(),
                resp_tx,
            })
            .map_err(|_| Error::Terminated)?;
        resp_rx.await.map_err(|_| Error::Terminated)?
    }

    /// Run source as an expression and return the engine's diagnostic
    /// rendering of its value
    pub async fn evaluate_display(&self, source: &str) -> Result<String, Error> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.op_tx
            .send(Op::EvaluateDisplay {
                source: source.to_string(),
                resp_tx,
            })
            .map_err(|_| Error::Terminated)?;
        resp_rx.await.map_err(|_| Error::Terminated)?
    }

    /// Introduce or overwrite a binding holding the given JSON value.
    /// Later `execute`/`evaluate` calls on this scope observe it
    pub async fn bind(&self, name: &str, value: Value) -> Result<(), Error> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.op_tx
            .send(Op::Bind {
                name: name.to_string(),
                value,
                resp_tx,
            })
            .map_err(|_| Error::Terminated)?;
        resp_rx.await.map_err(|_| Error::Terminated)?
    }
}

/// Scope thread: owns the engine context until the handle drops
fn run(mut op_rx: mpsc::UnboundedReceiver<Op>) {
    let mut ctx = Context::default();
    if let Err(e) = seed_host_bindings(&mut ctx) {
        debug!("failed to seed host bindings - {}", e);
    }

    while let Some(op) = op_rx.blocking_recv() {
        match op {
            Op::Execute { source, resp_tx } => {
                let res = eval(&mut ctx, &source).map(|_| ());
                let _ = resp_tx.send(res);
            }
            Op::Evaluate { source, resp_tx } => {
                let res = eval(&mut ctx, &source).map(|v| json_of(&v, &mut ctx));
                let _ = resp_tx.send(res);
            }
            Op::EvaluateDisplay { source, resp_tx } => {
                let res = eval(&mut ctx, &source).map(|v| v.display().to_string());
                let _ = resp_tx.send(res);
            }
            Op::Bind {
                name,
                value,
                resp_tx,
            } => {
                let _ = resp_tx.send(bind(&mut ctx, &name, value));
            }
        }
    }
    debug!("scope released");
}

/// Host bindings seeded into every new scope. Seeding is per scope;
/// process-global state is never touched
fn seed_host_bindings(ctx: &mut Context) -> boa_engine::JsResult<()> {
    let console = Console::init(ctx);
    ctx.register_global_property(js_string!(Console::NAME), console, Attribute::all())
}

fn eval(ctx: &mut Context, source: &str) -> Result<JsValue, Error> {
    ctx.eval(Source::from_bytes(source)).map_err(fault)
}

fn bind(ctx: &mut Context, name: &str, value: Value) -> Result<(), Error> {
    let value = JsValue::from_json(&value, ctx).map_err(fault)?;
    ctx.global_object()
        .set(JsString::from(name), value, false, ctx)
        .map_err(fault)?;
    Ok(())
}

/// Encode an engine value as JSON via the engine's own `JSON.stringify`.
/// Cycles make stringify throw and values JSON cannot carry stringify to
/// undefined; both fold to null rather than fault
fn json_of(value: &JsValue, ctx: &mut Context) -> Value {
    match stringify(value, ctx) {
        Some(text) => serde_json::from_str(&text).unwrap_or(Value::Null),
        None => Value::Null,
    }
}

fn stringify(value: &JsValue, ctx: &mut Context) -> Option<String> {
    let json_ns = ctx.global_object().get(js_string!("JSON"), ctx).ok()?;
    let func = json_ns.as_object()?.get(js_string!("stringify"), ctx).ok()?;
    let encoded = func
        .as_callable()?
        .call(&JsValue::undefined(), &[value.clone()], ctx)
        .ok()?;
    encoded.as_string()?.to_std_string().ok()
}

/// Fault carrying the engine's short message and its longer diagnostic
fn fault(err: JsError) -> Error {
    Error::Fault {
        message: err.to_string(),
        detail: format!("{:?}", err),
    }
}
