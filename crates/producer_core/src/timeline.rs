//! Resource timelines over the prediction window.
//!
//! Index `f` holds the predicted amount at frame offset `f` from now.
//! Spending at a frame lowers every later entry. Supply is tracked as an
//! uncapped running capacity plus usage; the hard cap is applied when the
//! timeline is read, so adding a provider after the cap has been reached
//! back-fills correctly when an earlier provider is later moved.

use crate::math::{project, Fixed};

/// Which gathered resource a timeline operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Minerals.
    Minerals,
    /// Gas.
    Gas,
}

/// Mineral, gas and supply predictions for one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timelines {
    window: i32,
    supply_cap: i32,
    minerals: Vec<i32>,
    gas: Vec<i32>,
    supply_capacity: Vec<i32>,
    supply_used: Vec<i32>,
}

impl Timelines {
    /// Flat timelines of `window` frames (at least one).
    #[must_use]
    pub fn new(window: i32, supply_cap: i32) -> Self {
        let window = window.max(1);
        let len = window as usize;
        Self {
            window,
            supply_cap,
            minerals: vec![0; len],
            gas: vec![0; len],
            supply_capacity: vec![0; len],
            supply_used: vec![0; len],
        }
    }

    /// Window length.
    #[must_use]
    pub const fn window(&self) -> i32 {
        self.window
    }

    /// Hard supply cap.
    #[must_use]
    pub const fn supply_cap(&self) -> i32 {
        self.supply_cap
    }

    fn series(&self, resource: Resource) -> &[i32] {
        match resource {
            Resource::Minerals => &self.minerals,
            Resource::Gas => &self.gas,
        }
    }

    fn series_mut(&mut self, resource: Resource) -> &mut [i32] {
        match resource {
            Resource::Minerals => &mut self.minerals,
            Resource::Gas => &mut self.gas,
        }
    }

    fn range(&self, from: i32) -> std::ops::Range<usize> {
        from.clamp(0, self.window) as usize..self.window as usize
    }

    /// Predicted amount at a frame. Frames before 0 read frame 0, frames at or
    /// past the window read the last frame.
    #[must_use]
    pub fn at(&self, resource: Resource, frame: i32) -> i32 {
        let series = self.series(resource);
        series[frame.clamp(0, self.window - 1) as usize]
    }

    /// Smallest amount over `[from, window)`, `i32::MAX` if the range is empty.
    #[must_use]
    pub fn min_from(&self, resource: Resource, from: i32) -> i32 {
        let range = self.range(from);
        self.series(resource)[range].iter().copied().min().unwrap_or(i32::MAX)
    }

    /// Seed a timeline with a bank and a linear income.
    pub fn seed(&mut self, resource: Resource, bank: i32, rate: Fixed) {
        for (f, value) in self.series_mut(resource).iter_mut().enumerate() {
            *value = bank + (rate * Fixed::from_num(f as i32)).round_to_zero().to_num::<i32>();
        }
    }

    /// Spend `amount` from `from` until the end of the window.
    pub fn spend(&mut self, resource: Resource, amount: i32, from: i32) {
        self.spend_between(resource, amount, from, self.window);
    }

    /// Spend `amount` over `[from, to)` only; frames from `to` on keep it.
    pub fn spend_between(&mut self, resource: Resource, amount: i32, from: i32, to: i32) {
        if amount == 0 {
            return;
        }
        let start = from.clamp(0, self.window) as usize;
        let end = to.clamp(0, self.window) as usize;
        if start >= end {
            return;
        }
        for value in &mut self.series_mut(resource)[start..end] {
            *value -= amount;
        }
    }

    /// Move a spend of `amount` at `from` by `delta` frames.
    pub fn move_spend(&mut self, resource: Resource, amount: i32, from: i32, delta: i32) {
        if delta > 0 {
            self.spend_between(resource, -amount, from, from + delta);
        } else if delta < 0 {
            self.spend_between(resource, amount, from + delta, from);
        }
    }

    /// Change the number of workers gathering a resource from `from`.
    ///
    /// The change takes effect on the frame after `from`.
    pub fn apply_rate_change(&mut self, resource: Resource, from: i32, workers: i32, rate: Fixed) {
        if workers == 0 {
            return;
        }
        let start = (from + 1).max(0);
        let range = self.range(start);
        let series = self.series_mut(resource);
        for f in range {
            series[f] += project(rate, workers, f as i32 - from);
        }
    }

    /// Move a rate change made at `from` by `delta` frames.
    pub fn move_rate_change(
        &mut self,
        resource: Resource,
        from: i32,
        delta: i32,
        workers: i32,
        rate: Fixed,
    ) {
        if delta == 0 {
            return;
        }
        self.apply_rate_change(resource, from, -workers, rate);
        self.apply_rate_change(resource, from + delta, workers, rate);
    }

    /// Free supply at a frame, with the hard cap applied.
    #[must_use]
    pub fn supply(&self, frame: i32) -> i32 {
        let f = frame.clamp(0, self.window - 1) as usize;
        self.supply_capacity[f].min(self.supply_cap) - self.supply_used[f]
    }

    /// Supply capacity at a frame, with the hard cap applied.
    #[must_use]
    pub fn total_supply(&self, frame: i32) -> i32 {
        let f = frame.clamp(0, self.window - 1) as usize;
        self.supply_capacity[f].min(self.supply_cap)
    }

    /// Smallest free supply over `[from, window)`.
    #[must_use]
    pub fn min_supply_from(&self, from: i32) -> i32 {
        (from.clamp(0, self.window)..self.window)
            .map(|f| self.supply(f))
            .min()
            .unwrap_or(i32::MAX)
    }

    /// Add supply capacity from `from`.
    pub fn add_supply(&mut self, amount: i32, from: i32) {
        let range = self.range(from);
        for value in &mut self.supply_capacity[range] {
            *value += amount;
        }
    }

    /// Move supply capacity added at `from` by `delta` frames.
    pub fn move_supply(&mut self, amount: i32, from: i32, delta: i32) {
        if delta == 0 {
            return;
        }
        self.add_supply(-amount, from);
        self.add_supply(amount, from + delta);
    }

    /// Consume supply from `from`.
    pub fn use_supply(&mut self, amount: i32, from: i32) {
        let range = self.range(from);
        for value in &mut self.supply_used[range] {
            *value += amount;
        }
    }

    /// Move supply usage made at `from` by `delta` frames.
    pub fn move_supply_use(&mut self, amount: i32, from: i32, delta: i32) {
        if delta == 0 {
            return;
        }
        self.use_supply(-amount, from);
        self.use_supply(amount, from + delta);
    }
}
