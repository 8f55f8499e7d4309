//! Lexical binding frames.
//!
//! Frames live in an arena owned by the interpreter and point at their
//! parent by index. A lambda sees its defining chain as it stood when the
//! lambda was made, so rebinding an outer variable later is invisible to
//! the closure. Values are copied, but handles inside them still point at
//! the same session arenas.
//!
//! Capturing copies nothing. Every write is stamped with a clock value and
//! a capture pushes one empty overlay frame whose parent link is pinned to
//! the clock at capture time. Lookups through a pinned link ignore newer
//! writes. Writes only overwrite in place when no capture can observe the
//! old value.

use crate::value::Value;
use indexmap::IndexMap;

/// Index of a frame in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

#[derive(Debug, Clone, Copy)]
struct Link {
    frame: FrameId,
    /// `None` follows the parent live, `Some(t)` sees writes up to `t`
    horizon: Option<u64>,
}

#[derive(Debug, Clone, Default)]
struct Frame {
    parent: Option<Link>,
    /// Write history per name, oldest first
    binds: IndexMap<String, Vec<(u64, Value)>>,
}

impl Frame {
    fn visible(&self, name: &str, horizon: u64) -> Option<&Value> {
        self.binds
            .get(name)?
            .iter()
            .rev()
            .find(|(stamp, _)| *stamp <= horizon)
            .map(|(_, value)| value)
    }
}

/// Arena of binding frames
#[derive(Debug, Clone, Default)]
pub struct Frames {
    frames: Vec<Frame>,
    clock: u64,
    /// Clock value of the latest capture
    sealed: u64,
}

impl Frames {
    /// Create an empty arena
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, parent: Option<Link>) -> FrameId {
        self.frames.push(Frame {
            parent,
            binds: IndexMap::new(),
        });
        FrameId(self.frames.len() - 1)
    }

    /// A frame with no parent
    pub fn root(&mut self) -> FrameId {
        self.alloc(None)
    }

    /// A frame nested in `parent`
    pub fn child(&mut self, parent: FrameId) -> FrameId {
        self.alloc(Some(Link {
            frame: parent,
            horizon: None,
        }))
    }

    /// Walk outward from `frame`, yielding each frame with the latest
    /// write stamp visible in it and the nearest pinned frame passed so far.
    fn chain(&self, frame: FrameId) -> impl Iterator<Item = (FrameId, u64, Option<FrameId>)> + '_ {
        let mut current = Some((frame, u64::MAX, None));
        std::iter::from_fn(move || {
            let (id, horizon, boundary) = current?;
            current = self.frames[id.0].parent.map(|link| match link.horizon {
                Some(pin) => (link.frame, horizon.min(pin), boundary.or(Some(id))),
                None => (link.frame, horizon, boundary),
            });
            Some((id, horizon, boundary))
        })
    }

    fn write(&mut self, frame: FrameId, name: &str, value: Value) {
        self.clock += 1;
        let stamp = self.clock;
        let sealed = self.sealed;
        let history = self.frames[frame.0]
            .binds
            .entry(name.to_string())
            .or_default();
        if history.last().is_some_and(|(last, _)| *last > sealed) {
            history.pop();
        }
        history.push((stamp, value));
    }

    /// Find a binding, walking outward
    #[must_use]
    pub fn lookup(&self, frame: FrameId, name: &str) -> Option<&Value> {
        self.chain(frame)
            .find_map(|(id, horizon, _)| self.frames[id.0].visible(name, horizon))
    }

    /// Bind in exactly this frame; `false` if already bound here
    pub fn define(&mut self, frame: FrameId, name: &str, value: Value) -> bool {
        if self.frames[frame.0].visible(name, u64::MAX).is_some() {
            return false;
        }
        self.write(frame, name, value);
        true
    }

    /// Bind in this frame, replacing any existing binding
    pub fn bind(&mut self, frame: FrameId, name: impl Into<String>, value: Value) {
        self.write(frame, &name.into(), value);
    }

    /// Replace the nearest existing binding; `false` if unbound everywhere.
    ///
    /// A binding found behind a capture is shadowed in the capture's
    /// overlay, leaving the captured chain untouched.
    pub fn assign(&mut self, frame: FrameId, name: &str, value: Value) -> bool {
        let found = self.chain(frame).find_map(|(id, horizon, boundary)| {
            self.frames[id.0]
                .visible(name, horizon)
                .map(|_| boundary.unwrap_or(id))
        });
        match found {
            Some(target) => {
                self.write(target, name, value);
                true
            }
            None => false,
        }
    }

    /// Bindings made directly in one frame, in definition order
    pub fn binds(&self, frame: FrameId) -> impl Iterator<Item = (&String, &Value)> {
        self.frames[frame.0]
            .binds
            .iter()
            .filter_map(|(name, history)| history.last().map(|(_, value)| (name, value)))
    }

    /// Freeze the chain ending at `frame`; returns a frame that sees it as
    /// it stands now.
    pub fn capture(&mut self, frame: FrameId) -> FrameId {
        self.sealed = self.clock;
        self.alloc(Some(Link {
            frame,
            horizon: Some(self.clock),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoping() {
        let mut frames = Frames::new();
        let root = frames.root();
        let inner = frames.child(root);
        assert!(frames.define(root, "x", Value::Int(1)));
        assert!(!frames.define(root, "x", Value::Int(2)));
        assert!(frames.define(inner, "x", Value::Int(3)));
        assert_eq!(frames.lookup(inner, "x"), Some(&Value::Int(3)));
        assert_eq!(frames.lookup(root, "x"), Some(&Value::Int(1)));
        assert_eq!(frames.lookup(root, "y"), None);
    }

    #[test]
    fn test_assign_walks_outward() {
        let mut frames = Frames::new();
        let root = frames.root();
        let inner = frames.child(root);
        frames.bind(root, "x", Value::Int(1));
        assert!(frames.assign(inner, "x", Value::Int(5)));
        assert_eq!(frames.lookup(root, "x"), Some(&Value::Int(5)));
        assert!(!frames.assign(inner, "nope", Value::Int(0)));
    }

    #[test]
    fn test_capture_is_a_snapshot() {
        let mut frames = Frames::new();
        let root = frames.root();
        let inner = frames.child(root);
        frames.bind(root, "x", Value::Int(1));
        frames.bind(inner, "y", Value::Int(2));

        let copy = frames.capture(inner);
        frames.assign(inner, "x", Value::Int(10));
        frames.bind(inner, "y", Value::Int(20));
        frames.bind(root, "z", Value::Int(30));

        assert_eq!(frames.lookup(copy, "x"), Some(&Value::Int(1)));
        assert_eq!(frames.lookup(copy, "y"), Some(&Value::Int(2)));
        assert_eq!(frames.lookup(copy, "z"), None);
        assert_eq!(frames.lookup(inner, "x"), Some(&Value::Int(10)));
        assert_eq!(frames.lookup(inner, "y"), Some(&Value::Int(20)));
    }

    #[test]
    fn test_assign_through_capture_stays_local() {
        let mut frames = Frames::new();
        let root = frames.root();
        frames.bind(root, "n", Value::Int(0));

        let copy = frames.capture(root);
        let call = frames.child(copy);
        assert!(frames.assign(call, "n", Value::Int(1)));

        assert_eq!(frames.lookup(call, "n"), Some(&Value::Int(1)));
        assert_eq!(frames.lookup(copy, "n"), Some(&Value::Int(1)));
        assert_eq!(frames.lookup(root, "n"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_nested_captures_keep_their_own_view() {
        let mut frames = Frames::new();
        let root = frames.root();
        frames.bind(root, "x", Value::Int(1));
        let first = frames.capture(root);
        frames.bind(root, "x", Value::Int(2));
        let inner = frames.child(first);
        let second = frames.capture(inner);
        frames.bind(root, "x", Value::Int(3));

        assert_eq!(frames.lookup(first, "x"), Some(&Value::Int(1)));
        assert_eq!(frames.lookup(second, "x"), Some(&Value::Int(1)));
        assert_eq!(frames.lookup(root, "x"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_capture_copies_no_bindings() {
        let mut frames = Frames::new();
        let root = frames.root();
        for i in 0..500 {
            frames.bind(root, format!("v{i}"), Value::Int(i));
            let copy = frames.capture(root);
            assert!(frames.frames[copy.0].binds.is_empty());
        }

        // One root plus one overlay per capture.
        assert_eq!(frames.frames.len(), 501);
        // Fresh names never grow a history.
        assert!(frames.frames[root.0].binds.values().all(|h| h.len() == 1));
    }
}
