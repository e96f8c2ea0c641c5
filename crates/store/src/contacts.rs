//! Authorized-contact, channel-instance, and dataset-binding lookups.

use voxbi_common::types::DatasetRef;

use crate::{
    Store,
    schema::{AuthorizedContact, ChannelInstance, DatasetBinding},
};

impl Store {
    /// All active authorizations for a phone number.
    pub async fn contacts_for_phone(&self, phone: &str) -> anyhow::Result<Vec<AuthorizedContact>> {
        let rows: Vec<(String, String, String, i64)> = sqlx::query_as(
            "SELECT phone, tenant_id, instance_id, active
             FROM authorized_contacts
             WHERE phone = ? AND active = 1
             ORDER BY id",
        )
        .bind(phone)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(phone, tenant_id, instance_id, active)| AuthorizedContact {
                phone,
                tenant_id,
                instance_id,
                active: active != 0,
            })
            .collect())
    }

    /// Look up a channel instance by id.
    pub async fn instance(&self, id: &str) -> anyhow::Result<Option<ChannelInstance>> {
        let row: Option<(String, String, String, String, i64)> = sqlx::query_as(
            "SELECT id, name, endpoint, credential, connected
             FROM channel_instances WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, name, endpoint, credential, connected)| ChannelInstance {
            id,
            name,
            endpoint,
            credential,
            connected: connected != 0,
        }))
    }

    /// Datasets a contact may query, in menu order.
    pub async fn bindings_for(
        &self,
        phone: &str,
        tenant_id: &str,
    ) -> anyhow::Result<Vec<DatasetBinding>> {
        let rows: Vec<(String, String, String, String, i64)> = sqlx::query_as(
            "SELECT tenant_id, connection_id, dataset_id, dataset_name, position
             FROM dataset_bindings
             WHERE phone = ? AND tenant_id = ?
             ORDER BY position, id",
        )
        .bind(phone)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(
                |(tenant_id, connection_id, dataset_id, dataset_name, position)| DatasetBinding {
                    tenant_id,
                    dataset: DatasetRef {
                        connection_id,
                        dataset_id,
                        dataset_name,
                    },
                    position,
                },
            )
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::memory_store;

    async fn seed(store: &crate::Store) {
        for (phone, tenant, instance, active) in [
            ("5511990000001", "acme", "wa-acme", 1i64),
            ("5511990000001", "globex", "wa-globex", 1),
            ("5511990000001", "initech", "wa-initech", 0),
            ("5511990000002", "acme", "wa-acme", 1),
        ] {
            sqlx::query(
                "INSERT INTO authorized_contacts (phone, tenant_id, instance_id, active)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(phone)
            .bind(tenant)
            .bind(instance)
            .bind(active)
            .execute(store.pool())
            .await
            .unwrap();
        }
        sqlx::query(
            "INSERT INTO channel_instances (id, name, endpoint, credential, connected)
             VALUES ('wa-acme', 'Acme WhatsApp', 'https://gw.local/acme', 'tok', 1)",
        )
        .execute(store.pool())
        .await
        .unwrap();
        for (pos, (conn, ds, name)) in [
            ("conn-1", "ds-sales", "Vendas"),
            ("conn-1", "ds-stock", "Estoque"),
        ]
        .iter()
        .enumerate()
        {
            sqlx::query(
                "INSERT INTO dataset_bindings
                 (phone, tenant_id, connection_id, dataset_id, dataset_name, position)
                 VALUES ('5511990000001', 'acme', ?, ?, ?, ?)",
            )
            .bind(conn)
            .bind(ds)
            .bind(name)
            .bind(pos as i64)
            .execute(store.pool())
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn active_contacts_only() {
        let store = memory_store().await;
        seed(&store).await;
        let contacts = store.contacts_for_phone("5511990000001").await.unwrap();
        assert_eq!(contacts.len(), 2);
        assert!(contacts.iter().all(|c| c.active));
        assert!(contacts.iter().any(|c| c.tenant_id == "acme"));
        assert!(contacts.iter().all(|c| c.tenant_id != "initech"));
    }

    #[tokio::test]
    async fn unknown_phone_has_no_contacts() {
        let store = memory_store().await;
        seed(&store).await;
        let contacts = store.contacts_for_phone("5511999999999").await.unwrap();
        assert!(contacts.is_empty());
    }

    #[tokio::test]
    async fn instance_lookup() {
        let store = memory_store().await;
        seed(&store).await;
        let inst = store.instance("wa-acme").await.unwrap().unwrap();
        assert_eq!(inst.name, "Acme WhatsApp");
        assert!(inst.connected);
        assert!(store.instance("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bindings_keep_menu_order() {
        let store = memory_store().await;
        seed(&store).await;
        let bindings = store.bindings_for("5511990000001", "acme").await.unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].dataset.dataset_name, "Vendas");
        assert_eq!(bindings[1].dataset.dataset_name, "Estoque");
    }
}
