//! Cancellation and deadline scope for a single login or verification call.

// crates.io
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
// self
use crate::{_prelude::*, error::CancelReason};

/// Caller-controlled scope bounding an operation.
///
/// Cloning shares the cancellation token; [`FlowContext::child`] derives a scope that is
/// cancelled together with its parent but can also be cancelled on its own.
#[derive(Clone, Debug, Default)]
pub struct FlowContext {
	token: CancellationToken,
	deadline: Option<Instant>,
}
impl FlowContext {
	/// Creates a context with no deadline.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a context that expires `timeout` from now.
	pub fn with_timeout(timeout: StdDuration) -> Self {
		Self::new().deadline_in(timeout)
	}

	/// Creates a context bound to an existing cancellation token.
	pub fn with_cancellation(token: CancellationToken) -> Self {
		Self { token, deadline: None }
	}

	/// Tightens the deadline to `timeout` from now; an earlier deadline is kept.
	pub fn deadline_in(self, timeout: StdDuration) -> Self {
		self.deadline_at(Instant::now() + timeout)
	}

	/// Tightens the deadline to `deadline`; an earlier deadline is kept.
	pub fn deadline_at(mut self, deadline: Instant) -> Self {
		self.deadline = Some(match self.deadline {
			Some(current) => current.min(deadline),
			None => deadline,
		});

		self
	}

	/// Derives a child scope sharing this context's deadline.
	pub fn child(&self) -> Self {
		Self { token: self.token.child_token(), deadline: self.deadline }
	}

	/// Cancels this context and every child derived from it.
	pub fn cancel(&self) {
		self.token.cancel();
	}

	/// Returns the deadline, if any.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Returns a clone of the underlying cancellation token.
	pub fn cancellation_token(&self) -> CancellationToken {
		self.token.clone()
	}

	/// Reports why the context is done, or `None` while it is still live.
	pub fn err(&self) -> Option<CancelReason> {
		if self.token.is_cancelled() {
			return Some(CancelReason::Cancelled);
		}

		match self.deadline {
			Some(deadline) if deadline <= Instant::now() => Some(CancelReason::DeadlineExceeded),
			_ => None,
		}
	}

	/// Resolves once the context is cancelled or its deadline elapses.
	pub async fn done(&self) -> CancelReason {
		match self.deadline {
			Some(deadline) => tokio::select! {
				biased;
				_ = self.token.cancelled() => CancelReason::Cancelled,
				_ = time::sleep_until(deadline) => CancelReason::DeadlineExceeded,
			},
			None => {
				self.token.cancelled().await;

				CancelReason::Cancelled
			},
		}
	}

	/// Drives `fut` to completion unless the context finishes first.
	///
	/// A context that is already done never polls `fut`.
	pub async fn run<F, T>(&self, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		tokio::select! {
			biased;
			reason = self.done() => Err(Error::Cancelled(reason)),
			result = fut => result,
		}
	}

	/// Sleeps for `duration` unless the context finishes first.
	pub async fn sleep(&self, duration: StdDuration) -> Result<()> {
		self.run(async {
			time::sleep(duration).await;

			Ok(())
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn run_returns_inner_result_when_live() {
		let ctx = FlowContext::with_timeout(StdDuration::from_secs(5));
		let value = ctx.run(async { Ok(7) }).await.expect("Live context should yield the value.");

		assert_eq!(value, 7);
		assert!(ctx.err().is_none());
	}

	#[tokio::test]
	async fn cancelled_context_never_polls_future() {
		let ctx = FlowContext::new();

		ctx.cancel();

		let polled = Arc::new(Mutex::new(false));
		let flag = polled.clone();
		let err = ctx
			.run(async move {
				*flag.lock() = true;

				Ok(())
			})
			.await
			.expect_err("Cancelled context should short-circuit.");

		assert!(matches!(err, Error::Cancelled(CancelReason::Cancelled)));
		assert!(!*polled.lock());
	}

	#[tokio::test]
	async fn deadline_interrupts_sleep() {
		let ctx = FlowContext::with_timeout(StdDuration::from_millis(50));
		let started = Instant::now();
		let err = ctx
			.sleep(StdDuration::from_secs(30))
			.await
			.expect_err("Deadline should interrupt the sleep.");

		assert!(matches!(err, Error::Cancelled(CancelReason::DeadlineExceeded)));
		assert!(started.elapsed() < StdDuration::from_secs(5));
		assert_eq!(ctx.err(), Some(CancelReason::DeadlineExceeded));
	}

	#[tokio::test]
	async fn parent_cancellation_reaches_child() {
		let parent = FlowContext::new();
		let child = parent.child();

		parent.cancel();

		assert_eq!(child.done().await, CancelReason::Cancelled);

		let sibling = FlowContext::new();
		let own = sibling.child();

		own.cancel();

		assert!(sibling.err().is_none());
	}

	#[test]
	fn deadline_only_tightens() {
		let ctx = FlowContext::with_timeout(StdDuration::from_secs(1));
		let first = ctx.deadline().expect("Deadline should be set.");
		let widened = ctx.deadline_in(StdDuration::from_secs(60));

		assert_eq!(widened.deadline(), Some(first));
	}
}
