use core::cell::UnsafeCell;
use core::sync::atomic::AtomicUsize;
use core::sync::atomic::Ordering::{Acquire, Relaxed, Release};

/** A fixed capacity circular queue for one producer and one consumer. One
  * slot always stays empty so the indices alone distinguish full from empty,
  * i.e. at most CAPACITY-1 items are held. push on a full queue drops the
  * new item; pop on an empty queue returns the default value. No operation
  * blocks, allocates or panics.
  *
  * Use it directly from a single context, or split() it into a producer and
  * a consumer half that may live on opposite sides of an interrupt
  * boundary. */
pub struct RingQueue<T, const CAPACITY: usize> {
	storage: UnsafeCell<[T; CAPACITY]>,
	head: AtomicUsize, // next slot to write, always < CAPACITY
	tail: AtomicUsize, // next slot to read, always < CAPACITY
}

// one side only writes head and reads tail, the other does the opposite;
// the Release/Acquire pairs on the indices order the slot accesses
unsafe impl<T: Send, const CAPACITY: usize> Sync for RingQueue<T, CAPACITY> {}

impl<T: Copy + Default, const CAPACITY: usize> RingQueue<T, CAPACITY> {
	pub fn new() -> RingQueue<T, CAPACITY> {
		RingQueue {
			storage: UnsafeCell::new([T::default(); CAPACITY]),
			head: AtomicUsize::new(0),
			tail: AtomicUsize::new(0),
		}
	}

	fn slot(&self, index: usize) -> *mut T {
		// wraps, so callers may pass an already advanced index
		unsafe { (self.storage.get() as *mut T).add(index % CAPACITY) }
	}

	fn push_internal(&self, item: T) {
		let head = self.head.load(Relaxed);
		let next = (head + 1) % CAPACITY;
		if next == self.tail.load(Acquire) {
			return; // full, the newest item is dropped
		}
		unsafe {
			self.slot(head).write(item);
		}
		self.head.store(next, Release);
	}

	fn pop_internal(&self) -> T {
		let tail = self.tail.load(Relaxed);
		if tail == self.head.load(Acquire) {
			return T::default(); // empty
		}
		let item = unsafe { self.slot(tail).read() };
		self.tail.store((tail + 1) % CAPACITY, Release);
		return item;
	}

	fn peek_internal(&self) -> T {
		let tail = self.tail.load(Relaxed);
		if tail == self.head.load(Acquire) {
			return T::default();
		}
		return unsafe { self.slot(tail).read() };
	}

	fn available_internal(&self) -> usize {
		let head = self.head.load(Acquire);
		let tail = self.tail.load(Acquire);
		return (head + CAPACITY - tail) % CAPACITY;
	}

	pub fn push(&mut self, item: T) {
		self.push_internal(item);
	}

	pub fn pop(&mut self) -> T {
		self.pop_internal()
	}

	pub fn peek(&self) -> T {
		self.peek_internal()
	}

	pub fn available(&self) -> usize {
		self.available_internal()
	}

	pub fn free_space(&self) -> usize {
		CAPACITY - 1 - self.available_internal()
	}

	pub fn is_full(&self) -> bool {
		let head = self.head.load(Acquire);
		(head + 1) % CAPACITY == self.tail.load(Acquire)
	}

	/** Forgets the queue content by resetting both indices. The storage is
	  * left as is. */
	pub fn clear(&mut self) {
		self.head.store(0, Relaxed);
		self.tail.store(0, Relaxed);
	}

	/** Pushes every item of the slice in order; items beyond the free space
	  * are dropped. */
	pub fn fill(&mut self, items: &[T]) {
		for item in items {
			self.push_internal(*item);
		}
	}

	/** Hands out the two halves. The borrow rules make sure there is never
	  * more than one producer or consumer at a time. */
	pub fn split(&mut self) -> (RingProducer<'_, T, CAPACITY>, RingConsumer<'_, T, CAPACITY>) {
		let queue = &*self;
		(RingProducer { queue }, RingConsumer { queue })
	}
}

pub struct RingProducer<'a, T, const CAPACITY: usize> {
	queue: &'a RingQueue<T, CAPACITY>,
}

pub struct RingConsumer<'a, T, const CAPACITY: usize> {
	queue: &'a RingQueue<T, CAPACITY>,
}

impl<T: Copy + Default, const CAPACITY: usize> RingProducer<'_, T, CAPACITY> {
	pub fn push(&mut self, item: T) {
		self.queue.push_internal(item);
	}

	pub fn is_full(&self) -> bool {
		self.queue.is_full()
	}

	pub fn free_space(&self) -> usize {
		CAPACITY - 1 - self.queue.available_internal()
	}
}

impl<T: Copy + Default, const CAPACITY: usize> RingConsumer<'_, T, CAPACITY> {
	pub fn pop(&mut self) -> T {
		self.queue.pop_internal()
	}

	pub fn peek(&self) -> T {
		self.queue.peek_internal()
	}

	pub fn available(&self) -> usize {
		self.queue.available_internal()
	}
}
