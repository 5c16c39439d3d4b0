//! Executes decoded streams against a table of server-side objects.
//!
//! The interpreter does not link any real object library. Every object is a generic
//! [`ServerObject`] that understands the accessor conventions used by proxy commands:
//!
//! | Method prefix | Effect                                      | Result           |
//! |---------------|---------------------------------------------|------------------|
//! | `Set<Name>`   | replaces the stored value of `<Name>`       | empty            |
//! | `Add<Name>`   | appends to the stored value of `<Name>`     | empty            |
//! | `RemoveAll<Name>` | clears the stored value of `<Name>`     | empty            |
//! | `Get<Name>`   | -                                           | stored value     |
//! | `GetClassName`| -                                           | the class name   |
//! | anything else | recorded only                               | empty            |
//!
//! Execution stops at the first failing message and the reply carries an `Error`.

use std::collections::{BTreeMap, HashSet};

use crate::{
    stream::{Argument, Command, Message, Stream},
    ObjectId,
};

/// One object living inside the interpreter.
#[derive(Debug, Clone, Default)]
pub struct ServerObject {
    class_name: String,
    values: BTreeMap<String, Vec<Argument>>,
}

impl ServerObject {
    /// Class the object was instantiated as.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Stored value for an accessor name (`Radius` for `SetRadius`).
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&[Argument]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// Pre-loads a value, as if the object computed it itself.
    pub fn set_value(&mut self, name: &str, value: Vec<Argument>) {
        self.values.insert(name.to_string(), value);
    }

    fn invoke(&mut self, method: &str, args: &[Argument]) -> Vec<Argument> {
        if method == "GetClassName" {
            return vec![Argument::from(self.class_name.as_str())];
        }

        if let Some(name) = method.strip_prefix("RemoveAll") {
            self.values.entry(name.to_string()).or_default().clear();
        } else if let Some(name) = method.strip_prefix("Set") {
            self.values.insert(name.to_string(), args.to_vec());
        } else if let Some(name) = method.strip_prefix("Add") {
            self.values
                .entry(name.to_string())
                .or_default()
                .extend(args.iter().cloned());
        } else if let Some(name) = method.strip_prefix("Get") {
            return self.values.get(name).cloned().unwrap_or_default();
        }

        Vec::new()
    }
}

/// Stream executor holding the objects of one process group.
#[derive(Debug, Default)]
pub struct Interpreter {
    objects: BTreeMap<ObjectId, ServerObject>,
    failing_methods: HashSet<String>,
    executed: Vec<Message>,
}

impl Interpreter {
    /// Creates an empty interpreter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes all messages in order and builds the reply.
    ///
    /// The reply carries the result of the last executed `Invoke`, or an `Error` message
    /// describing the first message that failed. Messages after a failure are not run.
    pub fn execute(&mut self, stream: &Stream) -> Stream {
        let mut last_result = Vec::new();

        for message in stream {
            match self.execute_message(message) {
                Ok(Some(result)) => last_result = result,
                Ok(None) => {}
                Err(text) => return Stream::error(&text),
            }
            self.executed.push(message.clone());
        }

        Stream::reply(last_result)
    }

    fn execute_message(
        &mut self,
        message: &Message,
    ) -> std::result::Result<Option<Vec<Argument>>, String> {
        match message.command {
            Command::New => {
                let class_name = message
                    .arguments
                    .first()
                    .and_then(Argument::as_str)
                    .ok_or_else(|| format!("New without class name: {message}"))?;
                let id = message
                    .target()
                    .ok_or_else(|| format!("New without object id: {message}"))?;

                if id.is_null() || self.objects.contains_key(&id) {
                    return Err(format!("Object id {id} is not available"));
                }

                self.objects.insert(
                    id,
                    ServerObject {
                        class_name: class_name.to_string(),
                        values: BTreeMap::new(),
                    },
                );
                Ok(None)
            }
            Command::Invoke => {
                let target = message
                    .target()
                    .ok_or_else(|| format!("Invoke without target: {message}"))?;
                let method = message
                    .method()
                    .ok_or_else(|| format!("Invoke without method: {message}"))?;

                if self.failing_methods.contains(method) {
                    return Err(format!("{method} failed on {target}"));
                }

                let object = self
                    .objects
                    .get_mut(&target)
                    .ok_or_else(|| format!("No object with id {target}"))?;

                Ok(Some(object.invoke(method, message.call_arguments())))
            }
            Command::Delete => {
                let id = message
                    .target()
                    .ok_or_else(|| format!("Delete without object id: {message}"))?;

                self.objects
                    .remove(&id)
                    .map(|_| None)
                    .ok_or_else(|| format!("No object with id {id}"))
            }
            Command::Reply | Command::Error => {
                Err(format!("Unexpected {} message in request", message.command))
            }
        }
    }

    /// Makes every later invoke of `method` fail.
    pub fn fail_method(&mut self, method: &str) {
        self.failing_methods.insert(method.to_string());
    }

    /// Reverts [`Interpreter::fail_method`].
    pub fn restore_method(&mut self, method: &str) {
        self.failing_methods.remove(method);
    }

    /// Looks up a live object.
    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&ServerObject> {
        self.objects.get(&id)
    }

    /// Mutable access to a live object.
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut ServerObject> {
        self.objects.get_mut(&id)
    }

    /// Number of live objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Every successfully executed message, in execution order.
    #[must_use]
    pub fn executed(&self) -> &[Message] {
        &self.executed
    }

    /// How many times `method` was successfully invoked on `target`.
    #[must_use]
    pub fn invocation_count(&self, target: ObjectId, method: &str) -> usize {
        self.executed
            .iter()
            .filter(|message| {
                message.command == Command::Invoke
                    && message.target() == Some(target)
                    && message.method() == Some(method)
            })
            .count()
    }

    /// Forgets the execution log, keeping the objects.
    pub fn clear_log(&mut self) {
        self.executed.clear();
    }
}
