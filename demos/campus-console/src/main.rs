use campus::prelude::*;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

const RESOURCES: &[&str] = &[
    "students", "courses", "grades", "invoices", "payments", "inventory", "purchases", "sales",
];

/// One row per resource, one column per action: `x` where allowed.
fn permission_table(eval: &PermissionEvaluator) -> String {
    let mut out = format!("{:<12}", "");
    for action in Action::ALL {
        out.push_str(&format!("{:<9}", action.as_str()));
    }
    out.push('\n');
    for resource in RESOURCES {
        out.push_str(&format!("{resource:<12}"));
        for action in Action::ALL {
            let mark = if eval.has_permission(resource, action) { "x" } else { "." };
            out.push_str(&format!("{mark:<9}"));
        }
        out.push('\n');
    }
    out
}

fn usage() -> ! {
    eprintln!("usage: campus-console <email> <password>");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    campus::init_tracing();

    let mut args = std::env::args().skip(1);
    let (Some(email), Some(password)) = (args.next(), args.next()) else {
        usage();
    };

    let config = Config::from_env();
    eprintln!("connecting to {} via {}", config.api_url, config.origin);
    let campus = Campus::from_config(config)?;
    campus.start().await?;

    let mut guard = campus.guard(GuardPolicy::Protected, |to: &str| {
        eprintln!("-> redirect to {to}");
    });
    guard.observe_session(&campus.subscribe().borrow());

    if let Err(e) = campus.login(email, password).await {
        eprintln!("sign-in failed: {}", e.user_message());
        return Err(e.into());
    }
    guard.observe_session(&campus.subscribe().borrow());

    if let Some(user) = campus.user() {
        let roles: Vec<_> = user.roles.iter().map(Role::as_str).collect();
        println!("signed in as {} <{}> [{}]", user.display_name, user.email, roles.join(", "));
    }
    print!("{}", permission_table(&campus.permissions()));

    campus.logout();
    guard.observe_session(&campus.subscribe().borrow());
    campus.shutdown();
    tracing::info!("done");
    Ok(())
}
