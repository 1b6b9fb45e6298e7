//! Variable binding frames for constant propagation.
//!
//! Names are case-insensitive and stored lowercased. A write overwrites the
//! nearest existing binding anywhere on the stack and only binds in the
//! innermost frame when the name is unbound. This follows the language's
//! ambient writes inside one script; it does not model function-local
//! shadowing.

use std::collections::HashMap;

use crate::domain::value::ConstValue;

#[derive(Debug)]
pub struct Scope {
    frames: Vec<HashMap<String, ConstValue>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    /// A stack holding the global frame.
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    pub fn enter(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Pops the innermost frame. The global frame is never popped.
    pub fn leave(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn get(&self, name: &str) -> Option<&ConstValue> {
        let key = name.to_lowercase();
        self.frames.iter().rev().find_map(|f| f.get(&key))
    }

    pub fn set(&mut self, name: &str, value: ConstValue) {
        let key = name.to_lowercase();
        let slot = self
            .frames
            .iter()
            .rposition(|f| f.contains_key(&key))
            .unwrap_or(self.frames.len() - 1);
        self.frames[slot].insert(key, value);
    }

    /// Forgets `name` in every frame.
    pub fn delete(&mut self, name: &str) {
        let key = name.to_lowercase();
        for frame in &mut self.frames {
            frame.remove(&key);
        }
    }
}
