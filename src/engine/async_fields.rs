//! Enemy-seek and entity-surround [FlowField]s are built off the main thread
//! on bevy's [AsyncComputeTaskPool].
//!
//! A request takes an owned snapshot of everything the field needs (the
//! oversized cost grid with blockers folded in and the seed cells) so a task
//! never touches navigation state. Each task writes only to its own output
//! and the results reach the [FieldCache] at a single join point:
//!
//! ```text
//!  request ─┬─> task 0 ─┐
//!           ├─> task 1 ─┼─> await_all ─> cache (submission order)
//!           └─> task 2 ─┘
//! ```
//!
//! Blockers and terrain must not be mutated between a request and the join.
//!

use std::collections::HashSet;

use bevy::{
	prelude::*,
	tasks::{block_on, AsyncComputeTaskPool, Task, TaskPool},
};

use crate::prelude::*;

/// Everything needed to compute a seek field without access to the engine
#[derive(Clone, Debug)]
pub struct SeekFieldInput {
	/// ID the result is cached under
	id: FlowFieldID,
	/// Effective cost of the seek grid, column by column
	costs: Vec<u8>,
	/// Seek grid cells the field flows towards
	seeds: Vec<(usize, usize)>,
}

impl SeekFieldInput {
	pub fn new(id: FlowFieldID, costs: Vec<u8>, seeds: Vec<(usize, usize)>) -> Self {
		assert_eq!(
			SEEK_FIELD_SIZE * SEEK_FIELD_SIZE,
			costs.len(),
			"Seek cost snapshot must cover the whole grid"
		);
		SeekFieldInput { id, costs, seeds }
	}
	pub fn get_id(&self) -> FlowFieldID {
		self.id
	}
	/// Integrate over the oversized grid and crop the flow of the sector
	pub fn compute(&self) -> FlowField {
		let mut integration_field = IntegrationField::new(SEEK_FIELD_SIZE, SEEK_FIELD_SIZE);
		integration_field.calculate_field(&self.seeds, |c, r| self.costs[c * SEEK_FIELD_SIZE + r]);
		let mut flow_field = FlowField::default();
		flow_field.calculate(&integration_field, (SEEK_FIELD_OFFSET, SEEK_FIELD_OFFSET));
		flow_field
	}
}

/// Outstanding seek field jobs of the current batch
pub struct AsyncFieldScheduler {
	/// Jobs in submission order
	pending: Vec<(FlowFieldID, Task<FlowField>)>,
	/// IDs of `pending` for quick lookup
	in_flight: HashSet<FlowFieldID>,
	/// Maximum number of jobs per batch
	capacity: usize,
}

impl Default for AsyncFieldScheduler {
	fn default() -> Self {
		AsyncFieldScheduler::new(MAX_ASYNC_FIELD_JOBS)
	}
}

impl AsyncFieldScheduler {
	pub fn new(capacity: usize) -> Self {
		if capacity == 0 {
			panic!("AsyncFieldScheduler needs room for at least one job");
		}
		AsyncFieldScheduler {
			pending: Vec::new(),
			in_flight: HashSet::new(),
			capacity,
		}
	}
	pub fn get_pending_count(&self) -> usize {
		self.pending.len()
	}
	pub fn is_in_flight(&self, id: &FlowFieldID) -> bool {
		self.in_flight.contains(id)
	}
	/// Launch a job for `input`. Returns `false` when the batch is full and
	/// the request was dropped, the caller is expected to compute the field
	/// itself next time it is needed
	pub fn submit(&mut self, input: SeekFieldInput) -> bool {
		let id = input.get_id();
		if self.in_flight.contains(&id) {
			return true;
		}
		if self.pending.len() >= self.capacity {
			warn!(
				"Async field batch is full ({} jobs), dropping {:?}",
				self.capacity, id
			);
			return false;
		}
		let pool = AsyncComputeTaskPool::get_or_init(TaskPool::new);
		let task = pool.spawn(async move { input.compute() });
		trace!("Spawned async field {:?}", id);
		self.in_flight.insert(id);
		self.pending.push((id, task));
		true
	}
	/// Block until every job of the batch is finished then commit the results
	/// into the cache in the order they were submitted. Returns the number of
	/// fields committed
	pub fn await_all(&mut self, field_cache: &mut FieldCache) -> usize {
		while !self.pending.iter().all(|(_, task)| task.is_finished()) {
			std::thread::yield_now();
		}
		let committed = self.pending.len();
		for (id, task) in self.pending.drain(..) {
			let flow_field = block_on(task);
			field_cache.insert_flow(id, flow_field);
		}
		self.in_flight.clear();
		if committed > 0 {
			debug!("Committed {} async fields", committed);
		}
		committed
	}
}
