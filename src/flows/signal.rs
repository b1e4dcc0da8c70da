//! One-shot signals published by flow attempts.

// crates.io
use tokio::sync::oneshot;
// self
use crate::_prelude::*;

/// Future returned by signal subscriptions; resolves to `None` when the attempt ended
/// without publishing.
pub type SignalFuture<T> = Pin<Box<dyn Future<Output = Option<T>> + Send>>;

/// Value published at most once and observable by any number of waiters.
///
/// Closing a signal settles it with no value so pending waiters resolve instead of
/// hanging.
#[derive(Debug)]
pub struct OnceSignal<T> {
	// Only `publish` and `close` initialize the cell. Neither runs an async initializer, so
	// `set_blocking` waits at most for the other's synchronous store and never parks a
	// runtime worker. Any async initialization path added here must switch both to `set`.
	cell: AsyncOnceCell<Option<T>>,
}
impl<T> OnceSignal<T> {
	/// Creates an unsettled signal.
	pub fn new() -> Self {
		Self { cell: AsyncOnceCell::new() }
	}

	/// Publishes `value`; returns `false` if the signal was already settled.
	pub fn publish(&self, value: T) -> bool {
		self.cell.set_blocking(Some(value)).is_ok()
	}

	/// Settles the signal without a value; returns `false` if it was already settled.
	pub fn close(&self) -> bool {
		self.cell.set_blocking(None).is_ok()
	}

	/// Returns `true` once the signal holds a value or has been closed.
	pub fn is_settled(&self) -> bool {
		self.cell.is_initialized()
	}

	/// Returns the published value without waiting.
	pub fn get(&self) -> Option<&T> {
		self.cell.get().and_then(Option::as_ref)
	}

	/// Waits until the signal settles.
	pub async fn wait(&self) -> Option<&T> {
		self.cell.wait().await.as_ref()
	}
}
impl<T> Default for OnceSignal<T> {
	fn default() -> Self {
		Self::new()
	}
}

/// Signal slot that is renewed for every attempt.
///
/// Subscribers grab the current signal, so subscribing before an attempt starts
/// observes that attempt. When an attempt ends its signal is closed and replaced.
#[derive(Debug)]
pub(crate) struct AttemptSignal<T> {
	current: Mutex<Arc<OnceSignal<T>>>,
}
impl<T> AttemptSignal<T>
where
	T: 'static + Send + Sync,
{
	pub(crate) fn new() -> Self {
		Self { current: Mutex::new(Arc::new(OnceSignal::new())) }
	}

	pub(crate) fn current(&self) -> Arc<OnceSignal<T>> {
		self.current.lock().clone()
	}

	/// Binds the current signal to a new attempt.
	pub(crate) fn begin(&self) -> AttemptGuard<'_, T> {
		AttemptGuard { owner: self, signal: self.current() }
	}

	/// Returns a future resolving to a projection of the current attempt's value.
	pub(crate) fn subscribe<U, F>(&self, project: F) -> SignalFuture<U>
	where
		U: 'static,
		F: 'static + Send + FnOnce(&T) -> U,
	{
		let signal = self.current();

		Box::pin(async move { signal.wait().await.map(project) })
	}
}

/// Publishing side of an [`AttemptSignal`]; closes and renews the signal on drop.
pub(crate) struct AttemptGuard<'a, T>
where
	T: 'static + Send + Sync,
{
	owner: &'a AttemptSignal<T>,
	signal: Arc<OnceSignal<T>>,
}
impl<T> AttemptGuard<'_, T>
where
	T: 'static + Send + Sync,
{
	pub(crate) fn publish(&self, value: T) -> bool {
		self.signal.publish(value)
	}
}
impl<T> Drop for AttemptGuard<'_, T>
where
	T: 'static + Send + Sync,
{
	fn drop(&mut self) {
		self.signal.close();

		let mut current = self.owner.current.lock();

		if Arc::ptr_eq(&current, &self.signal) {
			*current = Arc::new(OnceSignal::new());
		}
	}
}

/// Single-use delivery channel; the first successful delivery wins.
#[derive(Debug)]
pub(crate) struct DeliverySlot<T>(Mutex<Option<oneshot::Sender<T>>>);
impl<T> DeliverySlot<T> {
	/// Hands `value` to the receiver; gives it back if the slot was already used or closed.
	pub(crate) fn deliver(&self, value: T) -> Result<(), T> {
		let sender = self.0.lock().take();

		match sender {
			Some(sender) => sender.send(value),
			None => Err(value),
		}
	}

	/// Returns `true` while a delivery is still possible.
	pub(crate) fn is_open(&self) -> bool {
		self.0.lock().as_ref().is_some_and(|sender| !sender.is_closed())
	}
}

/// Creates a delivery slot and the receiver awaiting it.
pub(crate) fn delivery<T>() -> (DeliverySlot<T>, oneshot::Receiver<T>) {
	let (sender, receiver) = oneshot::channel();

	(DeliverySlot(Mutex::new(Some(sender))), receiver)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn waiters_registered_early_see_published_value() {
		let signal = Arc::new(OnceSignal::new());
		let waiter = tokio::spawn({
			let signal = signal.clone();

			async move { signal.wait().await.cloned() }
		});

		tokio::time::sleep(StdDuration::from_millis(10)).await;

		assert!(signal.publish("U1".to_owned()));
		assert!(!signal.publish("U2".to_owned()));
		assert_eq!(waiter.await.expect("Waiter task should finish."), Some("U1".to_owned()));
		assert_eq!(signal.get().map(String::as_str), Some("U1"));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn racing_publishers_settle_once_without_blocking_workers() {
		for _ in 0..32 {
			let signal = Arc::new(OnceSignal::new());
			let racers = (0..8_u32)
				.map(|i| {
					let signal = signal.clone();

					tokio::spawn(async move {
						if i % 2 == 0 { signal.publish(i) } else { signal.close() }
					})
				})
				.collect::<Vec<_>>();
			let mut settled = 0;

			for racer in racers {
				if tokio::time::timeout(StdDuration::from_secs(5), racer)
					.await
					.expect("Racer should not block.")
					.expect("Racer task should finish.")
				{
					settled += 1;
				}
			}

			assert_eq!(settled, 1);
			assert!(signal.is_settled());
		}
	}

	#[tokio::test]
	async fn closing_releases_waiters_without_value() {
		let signal = OnceSignal::<String>::new();

		assert!(signal.close());
		assert!(signal.is_settled());
		assert_eq!(signal.wait().await, None);
	}

	#[tokio::test]
	async fn attempt_guard_renews_signal_after_drop() {
		let slot = AttemptSignal::new();
		let first = slot.subscribe(|value: &u32| *value);

		{
			let attempt = slot.begin();

			assert!(attempt.publish(1));
		}

		assert_eq!(first.await, Some(1));

		let second = slot.subscribe(|value: &u32| *value);

		drop(slot.begin());

		assert_eq!(second.await, None);
		assert!(!slot.current().is_settled());
	}

	#[test]
	fn delivery_happens_at_most_once() {
		let (slot, mut receiver) = delivery();

		assert!(slot.is_open());
		assert_eq!(slot.deliver(1), Ok(()));
		assert_eq!(slot.deliver(2), Err(2));
		assert!(!slot.is_open());
		assert_eq!(receiver.try_recv().ok(), Some(1));
	}

	#[test]
	fn delivery_fails_once_receiver_is_gone() {
		let (slot, receiver) = delivery::<u32>();

		drop(receiver);

		assert!(!slot.is_open());
		assert_eq!(slot.deliver(9), Err(9));
	}
}
