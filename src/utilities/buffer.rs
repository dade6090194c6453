//! Filling fixed buffers from iterators, for code that can't allocate.

pub trait CollectSlice: Iterator {
    /// Collects an iterator into a given slice, returning the number of collected items.
    /// Collection stops when either side runs out.
    fn collect_slice(&mut self, slice: &mut [Self::Item]) -> usize;
}

pub trait TryCollectSlice: Iterator {
    type Element;
    type Error;

    /// Attempts to collect an iterator into a given slice, returning the number of collected items.
    /// No item is pulled past the first error, so a byte source behind
    /// the iterator is never read beyond a failure.
    fn try_collect_slice(&mut self, slice: &mut [Self::Element]) -> Result<usize, Self::Error>;
}

impl<I: Iterator> CollectSlice for I {
    fn collect_slice(&mut self, slice: &mut [Self::Item]) -> usize {
        slice.iter_mut().zip(self).fold(0, |count, (dest, item)| {
            *dest = item;
            count + 1
        })
    }
}

impl<I, T, E> TryCollectSlice for I
where
    I: Iterator<Item = Result<T, E>>,
{
    type Element = T;
    type Error = E;
    fn try_collect_slice(&mut self, slice: &mut [Self::Element]) -> Result<usize, Self::Error> {
        slice.iter_mut().zip(self).try_fold(0, |count, (dest, item)| {
            *dest = item?;
            Ok(count + 1)
        })
    }
}
