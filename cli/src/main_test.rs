use clap::CommandFactory;

use super::*;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("eventhub-cli").chain(args.iter().copied())).unwrap()
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn protected_commands_map_to_guarded_routes() {
    assert_eq!(parse(&["profile", "show"]).command.route(), Some("/profile"));
    assert_eq!(parse(&["events", "registrations"]).command.route(), Some("/dashboard"));
    assert_eq!(parse(&["events", "stats"]).command.route(), Some("/dashboard"));
    assert_eq!(parse(&["orgs", "create", "--name", "Rustaceans"]).command.route(), Some("/organizations/create"));
}

#[test]
fn public_commands_are_not_gated() {
    assert_eq!(parse(&["events", "list"]).command.route(), None);
    assert_eq!(parse(&["events", "slots"]).command.route(), None);
    assert_eq!(parse(&["orgs", "show", "3"]).command.route(), None);
    assert_eq!(parse(&["logout"]).command.route(), None);
}

#[test]
fn event_args_default_to_free() {
    let cli = parse(&[
        "events",
        "create",
        "--title",
        "Meetup",
        "--org-id",
        "2",
        "--venue",
        "Hall A",
        "--schedule",
        "2026-11-01T18:00:00Z",
        "--max-capacity",
        "40",
    ]);
    assert_eq!(cli.command.route(), Some("/events/create"));

    let Command::Events(EventsCommand { command: EventsSubcommand::Create(args) }) = cli.command else {
        panic!("expected events create");
    };
    let event = NewEvent::from(args);
    assert!(event.is_free);
    assert_eq!(event.org_id, 2);
    assert_eq!(event.max_capacity, 40);
    assert!(event.validate().is_ok());
}

#[test]
fn org_args_map_to_payload_fields() {
    let cli = parse(&["orgs", "update", "4", "--name", "New", "--website", "https://x.io"]);
    let Command::Orgs(OrgsCommand { command: OrgsSubcommand::Update { org_id, org } }) = cli.command else {
        panic!("expected orgs update");
    };
    let payload = NewOrganization::from(org);
    assert_eq!(org_id, 4);
    assert_eq!(payload.top_web_url.as_deref(), Some("https://x.io"));
    assert!(payload.org_logo.is_none());
}

#[test]
fn global_flags_parse() {
    let cli = parse(&["--api-url", "http://h/api", "--print-metrics", "whoami"]);
    assert_eq!(cli.api_url.as_deref(), Some("http://h/api"));
    assert!(cli.print_metrics);
}
