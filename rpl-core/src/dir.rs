//! Directories: nested name→value environments.
//!
//! A stack of directories over a persistent root. Lookup walks the
//! current path from the innermost frame outward; stores land in the
//! innermost directory. Numbered keys share the store with symbolic
//! names and carry per-key user assignments.

use crate::object::ObjPtr;
use rpl_types::ErrorKind;

use crate::error::SimpleResult;

/// A variable key: a symbol name or a numbered key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VarKey {
    /// Symbolic name.
    Name(String),
    /// Numbered key, e.g. a user key assignment.
    Key(u32),
}

impl VarKey {
    /// Key for a named variable.
    pub fn name(s: &str) -> VarKey {
        VarKey::Name(s.to_owned())
    }
}

/// What a variable is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// An object in the heap.
    Value(ObjPtr),
    /// A subdirectory, by arena index.
    Dir(usize),
}

/// One directory frame. Entries keep insertion order so variable menus
/// list them the way the user created them.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    entries: Vec<(VarKey, Binding)>,
}

impl Directory {
    fn get(&self, key: &VarKey) -> Option<Binding> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, b)| *b)
    }

    fn set(&mut self, key: VarKey, binding: Binding) {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = binding;
        } else {
            self.entries.push((key, binding));
        }
    }

    fn remove(&mut self, key: &VarKey) -> Option<Binding> {
        let at = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(at).1)
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&VarKey, Binding)> {
        self.entries.iter().map(|(k, b)| (k, *b))
    }
}

/// The whole directory tree plus the current path.
#[derive(Debug, Clone)]
pub struct Directories {
    arena: Vec<Directory>,
    names: Vec<Option<String>>,
    path: Vec<usize>,
}

impl Default for Directories {
    fn default() -> Self {
        Directories {
            arena: vec![Directory::default()],
            names: vec![None],
            path: vec![0],
        }
    }
}

impl Directories {
    /// Index of the innermost (current) directory.
    fn current(&self) -> usize {
        *self.path.last().expect("path never empty")
    }

    /// Look a name up in the current directory only.
    pub fn recall_local(&self, key: &VarKey) -> Option<Binding> {
        self.arena[self.current()].get(key)
    }

    /// Look a name up along the whole path, innermost first.
    pub fn recall(&self, key: &VarKey) -> Option<Binding> {
        self.path
            .iter()
            .rev()
            .find_map(|&dir| self.arena[dir].get(key))
    }

    /// Look a name up skipping the current directory; used when a
    /// variable shadows an outer binding that should still be visible.
    pub fn recall_all(&self, key: &VarKey) -> Option<Binding> {
        self.path
            .iter()
            .rev()
            .skip(1)
            .find_map(|&dir| self.arena[dir].get(key))
    }

    /// Bind a value in the current directory.
    pub fn store(&mut self, key: VarKey, value: ObjPtr) {
        let current = self.current();
        self.arena[current].set(key, Binding::Value(value));
    }

    /// Remove a binding from the current directory.
    pub fn purge(&mut self, key: &VarKey) -> SimpleResult<()> {
        let current = self.current();
        self.arena[current]
            .remove(key)
            .map(|_| ())
            .ok_or(ErrorKind::UndefinedName)
    }

    /// Create a subdirectory in the current directory and return its
    /// arena index. Entering an existing name reuses it.
    pub fn create_dir(&mut self, name: &str) -> usize {
        let key = VarKey::name(name);
        if let Some(Binding::Dir(dir)) = self.recall_local(&key) {
            return dir;
        }
        let dir = self.arena.len();
        self.arena.push(Directory::default());
        self.names.push(Some(name.to_owned()));
        let current = self.current();
        self.arena[current].set(key, Binding::Dir(dir));
        dir
    }

    /// Push a subdirectory onto the path.
    pub fn enter(&mut self, dir: usize) -> SimpleResult<()> {
        if dir >= self.arena.len() {
            return Err(ErrorKind::Internal);
        }
        self.path.push(dir);
        Ok(())
    }

    /// Pop the innermost directory; the root is never popped.
    pub fn updir(&mut self) {
        if self.path.len() > 1 {
            self.path.pop();
        }
    }

    /// Reset to the root directory.
    pub fn home(&mut self) {
        self.path.truncate(1);
    }

    /// Render the current path for the UI header, e.g. `HOME/geo/tri`.
    pub fn path(&self) -> String {
        let mut out = String::from("HOME");
        for &dir in self.path.iter().skip(1) {
            out.push('/');
            out.push_str(self.names[dir].as_deref().unwrap_or("?"));
        }
        out
    }

    /// Entries of the current directory, for variable menus.
    pub fn current_entries(&self) -> impl Iterator<Item = (&VarKey, Binding)> {
        self.arena[self.current()].entries()
    }

    /// Visit every stored object pointer; the collector rewrites moved
    /// targets through this.
    pub(crate) fn visit_roots(&mut self, f: &mut dyn FnMut(&mut u32)) {
        for dir in &mut self.arena {
            for (_, binding) in &mut dir.entries {
                if let Binding::Value(ptr) = binding {
                    f(&mut ptr.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_the_path() {
        let mut dirs = Directories::default();
        dirs.store(VarKey::name("a"), ObjPtr(1));
        let sub = dirs.create_dir("sub");
        dirs.enter(sub).unwrap();
        dirs.store(VarKey::name("b"), ObjPtr(2));

        assert_eq!(
            dirs.recall(&VarKey::name("a")),
            Some(Binding::Value(ObjPtr(1)))
        );
        assert_eq!(
            dirs.recall(&VarKey::name("b")),
            Some(Binding::Value(ObjPtr(2)))
        );
        assert_eq!(dirs.recall_local(&VarKey::name("a")), None);
        assert_eq!(dirs.path(), "HOME/sub");

        dirs.updir();
        assert_eq!(dirs.recall(&VarKey::name("b")), None);
    }

    #[test]
    fn shadowing_and_recall_all() {
        let mut dirs = Directories::default();
        dirs.store(VarKey::name("x"), ObjPtr(1));
        let sub = dirs.create_dir("sub");
        dirs.enter(sub).unwrap();
        dirs.store(VarKey::name("x"), ObjPtr(2));

        assert_eq!(
            dirs.recall(&VarKey::name("x")),
            Some(Binding::Value(ObjPtr(2)))
        );
        assert_eq!(
            dirs.recall_all(&VarKey::name("x")),
            Some(Binding::Value(ObjPtr(1)))
        );
    }

    #[test]
    fn purge_only_touches_the_current_frame() {
        let mut dirs = Directories::default();
        dirs.store(VarKey::name("x"), ObjPtr(1));
        let sub = dirs.create_dir("sub");
        dirs.enter(sub).unwrap();
        assert_eq!(dirs.purge(&VarKey::name("x")), Err(ErrorKind::UndefinedName));
        dirs.updir();
        assert_eq!(dirs.purge(&VarKey::name("x")), Ok(()));
    }

    #[test]
    fn numbered_keys_share_the_store() {
        let mut dirs = Directories::default();
        dirs.store(VarKey::Key(42), ObjPtr(7));
        assert_eq!(dirs.recall(&VarKey::Key(42)), Some(Binding::Value(ObjPtr(7))));
    }
}
