//! Best-effort launch of the system browser.

// std
use std::{
	io::Error as IoError,
	process::{Command, Stdio},
	thread,
};

/// Opens `url` in the default browser without waiting for it to exit.
pub fn open(url: &str) -> Result<(), IoError> {
	let mut command = command(url)?;
	let mut child =
		command.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null()).spawn()?;

	thread::spawn(move || {
		let _ = child.wait();
	});

	Ok(())
}

#[cfg(target_os = "macos")]
fn command(url: &str) -> Result<Command, IoError> {
	let mut command = Command::new("open");

	command.arg(url);

	Ok(command)
}

#[cfg(target_os = "windows")]
fn command(url: &str) -> Result<Command, IoError> {
	let mut command = Command::new("rundll32");

	command.args(["url.dll,FileProtocolHandler", url]);

	Ok(command)
}

#[cfg(all(unix, not(target_os = "macos")))]
fn command(url: &str) -> Result<Command, IoError> {
	let mut command = Command::new("xdg-open");

	command.arg(url);

	Ok(command)
}

#[cfg(not(any(unix, target_os = "windows")))]
fn command(_url: &str) -> Result<Command, IoError> {
	Err(IoError::new(
		std::io::ErrorKind::Unsupported,
		"no known browser launcher on this platform",
	))
}
