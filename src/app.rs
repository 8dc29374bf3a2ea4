use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::ops::github::NewPullRequest;
use crate::ops::github::PullRequestOutcome;
use crate::ops::niv::NivOps;
use crate::ops::sources::PinStore;
use crate::version::resolve_version;
use crate::version::version_of;

pub struct App<G: GitOps, N: NivOps, H: GithubOps, P: PinStore> {
    pub config: Config,
    pub git: G,
    pub niv: N,
    pub gh: H,
    pub pins: P,
}

impl<G: GitOps, N: NivOps, H: GithubOps, P: PinStore> App<G, N, H, P> {
    pub fn new(config: Config, git: G, niv: N, gh: H, pins: P) -> Self {
        Self {
            config,
            git,
            niv,
            gh,
            pins,
        }
    }
}

/// Shared helper methods for App
impl<G: GitOps, N: NivOps, H: GithubOps, P: PinStore> App<G, N, H, P> {
    /// Update one source and describe the change as `{name}: {old} -> {new}`
    pub(crate) async fn update_single_source(&self, name: &str) -> Result<String> {
        let pin = self.pins.read_pin(name).await?;
        let tags = self
            .gh
            .list_recent_tags(&pin.owner, &pin.repo, self.config.tag_limit)
            .await?;

        let old_version = resolve_version(&self.pins, name, &tags).await?;
        self.niv.update_source(name).await?;
        let updated = self.pins.read_pin(name).await?;

        // The tags were listed before the update; a release newer than that
        // listing needs another look before falling back to the revision
        let new_version = if tags.contains_key(&updated.revision) {
            version_of(&updated, &tags)
        } else {
            let fresh_tags = self
                .gh
                .list_recent_tags(&updated.owner, &updated.repo, self.config.tag_limit)
                .await?;
            version_of(&updated, &fresh_tags)
        };

        Ok(format!("{}: {} -> {}", name, old_version, new_version))
    }

    /// Create the PR for `head_branch`, or pass on GitHub's message if one is already open
    pub(crate) async fn open_pull_request(
        &self,
        title: &str,
        head_branch: &str,
    ) -> Result<PullRequestOutcome> {
        let remote = self.git.remote_info().await?;
        let repo = self.gh.repo_info(&remote).await?;

        let base_branch = self
            .config
            .base_branch
            .clone()
            .unwrap_or(repo.default_branch);

        let request = NewPullRequest {
            repository_id: repo.id,
            title: title.to_string(),
            body: self.config.pr_body.clone(),
            head_branch: head_branch.to_string(),
            base_branch,
        };
        self.gh.create_pull_request(&request).await
    }

    /// Resolve every login first, then request all reviews in one mutation.
    /// A failed lookup aborts before anything is requested.
    pub(crate) async fn add_reviewers(&self, pr_id: &str, logins: &[String]) -> Result<()> {
        let mut user_ids = Vec::with_capacity(logins.len());
        for login in logins {
            user_ids.push(self.gh.user_id(login).await?);
        }

        self.gh.request_reviews(pr_id, &user_ids).await?;
        info!(reviewers = ?logins, "requested reviews");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ops::git::MockGitOps;
    use crate::ops::git::RemoteInfo;
    use crate::ops::github::MockGithubOps;
    use crate::ops::github::RepoInfo;
    use crate::ops::github::TagMap;
    use crate::ops::niv::MockNivOps;
    use crate::ops::sources::MockPinStore;
    use crate::ops::sources::SourcePin;

    fn pin(revision: &str) -> SourcePin {
        SourcePin {
            repo: "foo".to_string(),
            owner: "acme".to_string(),
            branch: "main".to_string(),
            revision: revision.to_string(),
        }
    }

    /// Pin store whose revision moves from r1 to r2 once niv has run
    fn moving_pins() -> MockPinStore {
        let mut pins = MockPinStore::new();
        let mut reads = 0;
        pins.expect_read_pin().returning(move |_| {
            reads += 1;
            Ok(pin(if reads <= 2 { "r1" } else { "r2" }))
        });
        pins
    }

    fn app(gh: MockGithubOps, pins: MockPinStore) -> App<MockGitOps, MockNivOps, MockGithubOps, MockPinStore> {
        let mut niv = MockNivOps::new();
        niv.expect_update_source()
            .withf(|name| name == "foo")
            .times(1)
            .returning(|_| Ok(()));
        App::new(Config::default(), MockGitOps::new(), niv, gh, pins)
    }

    #[tokio::test]
    async fn test_update_single_source_uses_tag_names() {
        let mut gh = MockGithubOps::new();
        let mut listings = 0;
        gh.expect_list_recent_tags()
            .withf(|owner, repo, limit| owner == "acme" && repo == "foo" && *limit == 100)
            .times(2)
            .returning(move |_, _, _| {
                listings += 1;
                Ok(if listings == 1 {
                    TagMap::from([("r1".to_string(), "v1.0".to_string())])
                } else {
                    TagMap::from([("r2".to_string(), "v2.0".to_string())])
                })
            });

        let message = app(gh, moving_pins()).update_single_source("foo").await.unwrap();
        assert_eq!(message, "foo: v1.0 -> v2.0");
    }

    #[tokio::test]
    async fn test_update_single_source_lists_tags_once_when_new_revision_is_known() {
        let mut gh = MockGithubOps::new();
        gh.expect_list_recent_tags().times(1).returning(|_, _, _| {
            Ok(TagMap::from([
                ("r1".to_string(), "v1.0".to_string()),
                ("r2".to_string(), "v1.1".to_string()),
            ]))
        });

        let message = app(gh, moving_pins()).update_single_source("foo").await.unwrap();
        assert_eq!(message, "foo: v1.0 -> v1.1");
    }

    #[tokio::test]
    async fn test_update_single_source_falls_back_to_revisions() {
        let mut gh = MockGithubOps::new();
        gh.expect_list_recent_tags()
            .times(2)
            .returning(|_, _, _| Ok(TagMap::new()));

        let message = app(gh, moving_pins()).update_single_source("foo").await.unwrap();
        assert_eq!(message, "foo: r1 -> r2");
    }

    #[tokio::test]
    async fn test_open_pull_request_defaults_to_default_branch() {
        let mut git = MockGitOps::new();
        git.expect_remote_info().returning(|| {
            Ok(RemoteInfo {
                owner: "acme".to_string(),
                name: "infra".to_string(),
            })
        });

        let mut gh = MockGithubOps::new();
        gh.expect_repo_info()
            .withf(|remote| remote.owner == "acme" && remote.name == "infra")
            .returning(|_| {
                Ok(RepoInfo {
                    id: "R_1".to_string(),
                    default_branch: "master".to_string(),
                })
            });
        gh.expect_create_pull_request()
            .withf(|request| {
                request.repository_id == "R_1"
                    && request.base_branch == "master"
                    && request.head_branch == "bot/update-nix-sources"
                    && request.title == "Title"
            })
            .returning(|_| {
                Ok(PullRequestOutcome::AlreadyExists(
                    "A pull request already exists for acme:bot/update-nix-sources.".to_string(),
                ))
            });

        let app = App::new(
            Config::default(),
            git,
            MockNivOps::new(),
            gh,
            MockPinStore::new(),
        );
        let pr = app
            .open_pull_request("Title", "bot/update-nix-sources")
            .await
            .unwrap();
        assert!(matches!(pr, PullRequestOutcome::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_add_reviewers_requests_all_at_once() {
        let mut gh = MockGithubOps::new();
        gh.expect_user_id()
            .times(2)
            .returning(|login| Ok(format!("U_{}", login)));
        gh.expect_request_reviews()
            .withf(|pr_id, user_ids| pr_id == "PR_1" && user_ids == ["U_alice", "U_bob"])
            .times(1)
            .returning(|_, _| Ok(()));

        let app = App::new(
            Config::default(),
            MockGitOps::new(),
            MockNivOps::new(),
            gh,
            MockPinStore::new(),
        );
        app.add_reviewers("PR_1", &["alice".to_string(), "bob".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_add_reviewers_aborts_on_unknown_user() {
        let mut gh = MockGithubOps::new();
        gh.expect_user_id().returning(|login| {
            if login == "ghost" {
                Err(Error::api("Could not resolve to a User with the login of 'ghost'").into())
            } else {
                Ok(format!("U_{}", login))
            }
        });
        gh.expect_request_reviews().never();

        let app = App::new(
            Config::default(),
            MockGitOps::new(),
            MockNivOps::new(),
            gh,
            MockPinStore::new(),
        );
        let err = app
            .add_reviewers("PR_1", &["alice".to_string(), "ghost".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Api { .. })));
    }
}
