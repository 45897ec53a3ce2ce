use crate::error::{RegistrationError, Result, ToolError};
use crate::output::ToolOutput;
use crate::schema::{is_object_schema, root_type, schema_for};
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type HandlerFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;
type Handler = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

/// A registered tool: its advertised schema plus the bound handler.
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// Rust type name of the argument record, or `serde_json::Value` for dynamic tools.
    pub type_name: String,
    pub parameters: Value,
    handler: Handler,
}

impl ToolDefinition {
    pub fn to_llm_tool(&self) -> parley_llm::Tool {
        parley_llm::Tool::function(&self.name, &self.description, self.parameters.clone())
    }

    pub async fn invoke(&self, arguments: Value) -> Result<String> {
        (self.handler)(arguments).await
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("type_name", &self.type_name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

#[derive(Default, Clone, Debug)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `f` under `name`, deriving the parameter schema from `A`.
    ///
    /// Arguments missing from a call take their value from `A::default()`, so tools can
    /// treat every field as present. Re-registering a name replaces the earlier tool and
    /// returns its argument type name.
    ///
    /// `f` runs on the blocking thread pool and may block.
    pub fn register<A, R, F>(
        &mut self,
        name: &str,
        description: &str,
        f: F,
    ) -> std::result::Result<Option<String>, RegistrationError>
    where
        A: DeserializeOwned + Serialize + Default + JsonSchema + Send + 'static,
        R: ToolOutput,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        let parameters = schema_for::<A>();
        let f = Arc::new(f);
        let handler: Handler = Arc::new(move |arguments: Value| -> HandlerFuture {
            let f = Arc::clone(&f);
            Box::pin(async move {
                let args: A = decode_lenient(arguments)?;
                run_blocking(move || f(args).into_tool_output()).await
            })
        });
        self.insert(
            name,
            description,
            std::any::type_name::<A>(),
            parameters,
            handler,
        )
    }

    /// Registers an async tool. The returned future is awaited on the runtime.
    pub fn register_async<A, R, F, Fut>(
        &mut self,
        name: &str,
        description: &str,
        f: F,
    ) -> std::result::Result<Option<String>, RegistrationError>
    where
        A: DeserializeOwned + Serialize + Default + JsonSchema + Send + 'static,
        R: ToolOutput + Send,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let parameters = schema_for::<A>();
        let handler: Handler = Arc::new(move |arguments: Value| -> HandlerFuture {
            let fut = match decode_lenient::<A>(arguments) {
                Ok(args) => f(args),
                Err(e) => return Box::pin(std::future::ready(Err(e))),
            };
            Box::pin(async move { fut.await.into_tool_output() })
        });
        self.insert(
            name,
            description,
            std::any::type_name::<A>(),
            parameters,
            handler,
        )
    }

    /// Registers a handler that receives the raw argument object. `parameters` must be an
    /// object schema.
    pub fn register_dyn<F>(
        &mut self,
        name: &str,
        description: &str,
        parameters: Value,
        f: F,
    ) -> std::result::Result<Option<String>, RegistrationError>
    where
        F: Fn(Value) -> Result<String> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let handler: Handler = Arc::new(move |arguments: Value| -> HandlerFuture {
            if !arguments.is_object() {
                return Box::pin(std::future::ready(Err(ToolError::InvalidArguments(
                    "arguments must be a JSON object".to_string(),
                ))));
            }
            let f = Arc::clone(&f);
            Box::pin(run_blocking(move || f(arguments)))
        });
        self.insert(
            name,
            description,
            std::any::type_name::<Value>(),
            parameters,
            handler,
        )
    }

    fn insert(
        &mut self,
        name: &str,
        description: &str,
        type_name: &str,
        parameters: Value,
        handler: Handler,
    ) -> std::result::Result<Option<String>, RegistrationError> {
        parley_llm::validate_tool_name_all_providers(name).map_err(|e| {
            RegistrationError::InvalidName {
                name: name.to_string(),
                reason: e.to_string(),
            }
        })?;
        if !is_object_schema(&parameters) {
            return Err(RegistrationError::NotAnObject {
                name: name.to_string(),
                found: root_type(&parameters),
            });
        }

        let def = ToolDefinition {
            name: name.to_string(),
            description: description.to_string(),
            type_name: type_name.to_string(),
            parameters,
            handler,
        };
        let previous = self.tools.insert(name.to_string(), def).map(|d| d.type_name);
        match &previous {
            Some(prev) => tracing::warn!(
                tool_name = name,
                previous_type = %prev,
                "tool re-registered; replacing earlier definition"
            ),
            None => tracing::debug!(tool_name = name, type_name, "tool registered"),
        }
        Ok(previous)
    }

    /// Runs the named tool with a JSON-encoded argument object.
    #[tracing::instrument(level = "debug", skip_all, fields(tool_name = name))]
    pub async fn execute(&self, name: &str, arguments: &str) -> Result<String> {
        let Some(def) = self.tools.get(name) else {
            return Err(ToolError::NotFound(name.to_string()));
        };
        let value: Value = if arguments.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(arguments)
                .map_err(|e| ToolError::InvalidArguments(format!("malformed json: {e}")))?
        };
        if !value.is_object() {
            return Err(ToolError::InvalidArguments(format!(
                "arguments must be a JSON object, got {}",
                json_kind(&value)
            )));
        }
        def.invoke(value).await
    }

    /// Every tool in request form, sorted by name.
    pub fn tools(&self) -> Vec<parley_llm::Tool> {
        self.tools.values().map(ToolDefinition::to_llm_tool).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Runs a synchronous handler off the async workers. A panic becomes `ExecutionFailed`.
async fn run_blocking<F>(f: F) -> Result<String>
where
    F: FnOnce() -> Result<String> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ToolError::ExecutionFailed(format!("tool task failed: {e}")))?
}

/// Overlays the supplied keys on the serialized default record, then decodes.
fn decode_lenient<A: DeserializeOwned + Serialize + Default>(arguments: Value) -> Result<A> {
    let merged = match (serde_json::to_value(A::default()), arguments) {
        (Ok(Value::Object(mut base)), Value::Object(supplied)) => {
            base.extend(supplied);
            Value::Object(base)
        }
        (_, supplied) => supplied,
    };
    serde_json::from_value(merged).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
