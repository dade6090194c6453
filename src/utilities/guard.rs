//! RAII guard that calls a given function when constructed,
//! and another when it drops out of scope.
//!
//! Useful for ensuring resource cleanup no matter the return
//! path. The guarded item stays reachable through the guard.
//!
//! Example
//! ```
//! # use cmdboot_lib::utilities::guard::Guard;
//! let mut events = Vec::new();
//! {
//!     let mut guarded = Guard::new(&mut events, |e| e.push("enter"), |e| e.push("exit"));
//!     guarded.push("work");
//! }
//! assert_eq!(events, ["enter", "work", "exit"]);
//! ```

use core::{
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

pub struct Guard<'a, T, F, G>
where
    F: FnOnce(&mut T),
    G: FnOnce(&mut T),
{
    item: &'a mut T,
    on_exit: Option<G>,
    _marker: PhantomData<F>,
}

impl<'a, T, F, G> Guard<'a, T, F, G>
where
    F: FnOnce(&mut T),
    G: FnOnce(&mut T),
{
    pub fn new(item: &'a mut T, on_entry: F, on_exit: G) -> Self {
        on_entry(item);
        Self { item, on_exit: Some(on_exit), _marker: PhantomData }
    }
}

impl<'a, T, F, G> Deref for Guard<'a, T, F, G>
where
    F: FnOnce(&mut T),
    G: FnOnce(&mut T),
{
    type Target = T;
    fn deref(&self) -> &T { self.item }
}

impl<'a, T, F, G> DerefMut for Guard<'a, T, F, G>
where
    F: FnOnce(&mut T),
    G: FnOnce(&mut T),
{
    fn deref_mut(&mut self) -> &mut T { self.item }
}

impl<'a, T, F, G> Drop for Guard<'a, T, F, G>
where
    F: FnOnce(&mut T),
    G: FnOnce(&mut T),
{
    fn drop(&mut self) {
        if let Some(on_exit) = self.on_exit.take() {
            on_exit(self.item);
        }
    }
}
