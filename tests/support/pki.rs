//! Throwaway PKI for the three hops.
//!
//! Written in the same layout the binary expects by default:
//! `certificates/ca/ca.crt` and `certificates/<server-name>/{server,client}.{crt,key}`.

use std::fs;
use std::path::{Path, PathBuf};

use credhop::core::types::Role;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyPair, KeyUsagePurpose,
};

pub const ROLES: [Role; 3] = [Role::Gateway, Role::Switch, Role::Vault];

/// Paths of everything [`Pki::generate`] wrote.
pub struct Pki {
    pub root: PathBuf,
    ca: Authority,
}

struct Authority {
    cert: Certificate,
    key: KeyPair,
}

impl Authority {
    fn new(name: &str) -> Self {
        let key = KeyPair::generate().expect("ca key");
        let mut params = CertificateParams::new(Vec::<String>::new()).expect("ca params");
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
        params.distinguished_name = dn(name, "CredhopTest");
        let cert = params.self_signed(&key).expect("self-signed ca");
        Self { cert, key }
    }

    /// Issue a leaf and write `<stem>.crt` / `<stem>.key` into `dir`.
    fn issue(
        &self,
        dir: &Path,
        stem: &str,
        dns_name: &str,
        common_name: &str,
        organization: &str,
        usage: ExtendedKeyUsagePurpose,
    ) {
        let key = KeyPair::generate().expect("leaf key");
        let mut params = CertificateParams::new(vec![dns_name.to_string()]).expect("leaf params");
        params.distinguished_name = dn(common_name, organization);
        params.extended_key_usages = vec![usage];
        let cert = params
            .signed_by(&key, &self.cert, &self.key)
            .expect("sign leaf");

        fs::write(dir.join(format!("{stem}.crt")), cert.pem()).expect("write cert");
        fs::write(dir.join(format!("{stem}.key")), key.serialize_pem()).expect("write key");
    }
}

fn dn(common_name: &str, organization: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    dn.push(DnType::OrganizationName, organization);
    dn
}

impl Pki {
    /// Create a CA plus a server and a client certificate per hop.
    pub fn generate(dir: &Path) -> Self {
        let root = dir.join("certificates");
        let ca = Authority::new("credhop test CA");

        let ca_dir = root.join("ca");
        fs::create_dir_all(&ca_dir).expect("create ca dir");
        fs::write(ca_dir.join("ca.crt"), ca.cert.pem()).expect("write ca");

        for role in ROLES {
            let hop_dir = root.join(role.server_name());
            fs::create_dir_all(&hop_dir).expect("create hop dir");
            ca.issue(
                &hop_dir,
                "server",
                role.server_name(),
                role.server_name(),
                role.organization(),
                ExtendedKeyUsagePurpose::ServerAuth,
            );
            ca.issue(
                &hop_dir,
                "client",
                role.server_name(),
                &format!("{}-client", role.server_name()),
                role.organization(),
                ExtendedKeyUsagePurpose::ClientAuth,
            );
        }

        Self { root, ca }
    }

    /// A server certificate for `role`'s name, signed by the trusted CA,
    /// but carrying `organization` instead of the role's own.
    pub fn server_with_organization(&self, role: Role, organization: &str) -> (PathBuf, PathBuf) {
        let dir = self.root.join("impostor").join(role.server_name());
        fs::create_dir_all(&dir).expect("create impostor dir");
        self.ca.issue(
            &dir,
            "server",
            role.server_name(),
            role.server_name(),
            organization,
            ExtendedKeyUsagePurpose::ServerAuth,
        );
        (dir.join("server.crt"), dir.join("server.key"))
    }

    /// A client certificate claiming `organization` but signed by an
    /// unrelated CA.
    pub fn rogue_client(&self, organization: &str) -> (PathBuf, PathBuf) {
        let dir = self.root.join("rogue");
        fs::create_dir_all(&dir).expect("create rogue dir");
        Authority::new("rogue CA").issue(
            &dir,
            "client",
            "rogue",
            "rogue-client",
            organization,
            ExtendedKeyUsagePurpose::ClientAuth,
        );
        (dir.join("client.crt"), dir.join("client.key"))
    }

    pub fn ca(&self) -> PathBuf {
        self.root.join("ca").join("ca.crt")
    }

    pub fn server_cert(&self, role: Role) -> PathBuf {
        self.root.join(role.server_name()).join("server.crt")
    }

    pub fn server_key(&self, role: Role) -> PathBuf {
        self.root.join(role.server_name()).join("server.key")
    }

    pub fn client_cert(&self, role: Role) -> PathBuf {
        self.root.join(role.server_name()).join("client.crt")
    }

    pub fn client_key(&self, role: Role) -> PathBuf {
        self.root.join(role.server_name()).join("client.key")
    }
}
