//!
//! micropost-auth console
//! ----------------------
//! Line-oriented driver for the request gate. Seeds a small demo data set and then
//! reads commands from stdin, acting as a single browser: it holds one visitor id
//! and, after a successful sign-in, one session token.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use micropost_auth::identity::{AccessDecision, RequestContext, SessionToken, VisitorId};
use micropost_auth::navigation;
use micropost_auth::routes::{Method, Route};
use micropost_auth::storage::{MemoryStore, NewUser};
use micropost_auth::{AuthConfig, RequestGate};

fn print_usage() {
    eprintln!(
        "Commands:\n  signin <email> <password> [remember]   sign in (POST /sessions)\n  signout                               sign out (DELETE /signout)\n  get <path>                            fetch a page\n  post|patch|delete <path>              submit a form\n  whoami                                show the signed-in user\n  nav                                   show header links\n  help                                  show this help\n  quit | exit                           leave\n\nDemo users (password 'foobar'): admin@example.org (admin), example@railstutorial.org, wrong@example.com"
    );
}

fn seed(store: &MemoryStore) -> Result<()> {
    let admin = store.create_user(NewUser::new("Admin", "admin@example.org", "foobar").admin())?;
    let user = store.create_user(NewUser::new("Example User", "example@railstutorial.org", "foobar"))?;
    let wrong = store.create_user(NewUser::new("Wrong User", "wrong@example.com", "foobar"))?;
    store.create_micropost(user.id, "Lorem ipsum")?;
    store.create_micropost(wrong.id, "Dolor sit amet")?;
    store.follow(user.id, admin.id)?;
    store.follow(wrong.id, user.id)?;
    Ok(())
}

struct Browser {
    visitor: VisitorId,
    token: Option<SessionToken>,
}

impl Browser {
    fn ctx(&self) -> RequestContext {
        match &self.token {
            Some(t) => RequestContext::with_token(self.visitor, t.clone()),
            None => RequestContext::anonymous(self.visitor),
        }
    }
}

fn sign_out(gate: &RequestGate, browser: &mut Browser) -> String {
    let to = gate.sign_out(&browser.ctx());
    browser.token = None;
    format!("302 -> {}", to)
}

fn request(gate: &RequestGate, browser: &mut Browser, method: Method, path: &str) -> Result<String> {
    let route = Route::parse(method, path).ok_or_else(|| anyhow!("no route for {} {}", method, path))?;
    let ctx = browser.ctx();
    let out = match route {
        Route::CreateSession => return Err(anyhow!("{} needs credentials; use 'signin <email> <password>'", route)),
        Route::DestroySession => return Ok(sign_out(gate, browser)),
        Route::DestroyUser(id) => gate.destroy_user(&ctx, id)?,
        _ => gate.handle(&ctx, &route)?,
    };
    Ok(match out.decision {
        AccessDecision::Allow => format!("200 OK {}", route),
        AccessDecision::DenyRedirect(_) => format!("302 -> {}", out.redirect_to.unwrap_or_default()),
        AccessDecision::DenyForbidden => "403 Forbidden".to_string(),
    })
}

fn run_line(gate: &RequestGate, browser: &mut Browser, line: &str) -> Result<bool> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(cmd) = parts.first() else { return Ok(true) };
    match (cmd.to_ascii_lowercase().as_str(), &parts[1..]) {
        ("quit" | "exit", _) => return Ok(false),
        ("help", _) => print_usage(),
        ("signin", [email, password, rest @ ..]) => {
            let remember = rest.first().map(|s| s.eq_ignore_ascii_case("remember")).unwrap_or(false);
            match gate.sign_in(&browser.ctx(), email, password, remember) {
                Ok(resp) => {
                    browser.token = Some(resp.session.token);
                    println!("302 -> {}  (signed in as {})", resp.redirect_to, resp.identity.display_name);
                }
                Err(e) => println!("{} {}", e.http_status(), e.message()),
            }
        }
        ("signout", _) => println!("{}", sign_out(gate, browser)),
        ("whoami", _) => match gate.current_user(&browser.ctx()) {
            Some(u) => println!("{} <{}>{}", u.display_name, u.email, if u.is_admin { " [admin]" } else { "" }),
            None => println!("(anonymous)"),
        },
        ("nav", _) => {
            for l in navigation::links(gate.current_user(&browser.ctx()).as_ref()) {
                println!("{:<10} {}", l.label, l.href);
            }
        }
        (verb, [path]) => match Method::parse(verb) {
            Some(m) => println!("{}", request(gate, browser, m, path)?),
            None => eprintln!("unknown command '{}'; try 'help'", verb),
        },
        (other, _) => eprintln!("unknown command '{}'; try 'help'", other),
    }
    Ok(true)
}

fn main() -> Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow!(e.to_string()))?;
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let cfg = AuthConfig::load()?;
    info!(
        target: "micropost_auth",
        "micropost-auth console: session_ttl_secs={} remember_ttl_secs={} intent_ttl_secs={}",
        cfg.session_ttl_secs, cfg.remember_ttl_secs, cfg.intent_ttl_secs
    );

    let store = Arc::new(MemoryStore::new());
    seed(&store)?;
    let gate = RequestGate::new(store, cfg);
    let mut browser = Browser { visitor: VisitorId::new(), token: None };

    print_usage();
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match run_line(&gate, &mut browser, line.trim()) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(())
}
