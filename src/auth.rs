use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

pub const PASSWORD_ENV: &str = "PIXVAULT_PASSWORD";

fn from_env() -> Option<Zeroizing<String>> {
    //  PIXVAULT_PASSWORD="supersecret" pixvault decode --input stego.png --decrypt
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

/// Password for opening an encrypted message.
pub fn read_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = from_env() {
        return Ok(pw);
    }

    //  echo "supersecret" | pixvault decode --input stego.png --decrypt
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_line(&mut buf)?;
        trim_newline(&mut buf);

        if !buf.is_empty() {
            return Ok(buf);
        }
    }

    if io::stdin().is_terminal() {
        let pw = Zeroizing::new(rpassword::prompt_password("Password: ")?);
        if !pw.is_empty() {
            return Ok(pw);
        }
    }

    bail!("No password provided")
}

/// Password for sealing a new message; confirmed when typed interactively.
pub fn read_new_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = from_env() {
        return Ok(pw);
    }

    if !io::stdin().is_terminal() {
        let stdin = io::stdin();
        let mut handle = stdin.lock();

        let mut pw = Zeroizing::new(String::new());
        handle.read_line(&mut pw)?;
        trim_newline(&mut pw);

        if pw.is_empty() {
            bail!("password cannot be empty");
        }
        return Ok(pw);
    }

    let pw1 = Zeroizing::new(rpassword::prompt_password("New password: ")?);
    let pw2 = Zeroizing::new(rpassword::prompt_password("Confirm password: ")?);

    if pw1.is_empty() {
        bail!("password cannot be empty");
    }

    if pw1 != pw2 {
        bail!("passwords do not match");
    }

    Ok(pw1)
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
